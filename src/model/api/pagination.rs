use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};
use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 50;

/// Pagination parameters, extracted from the `page` and `limit` query
/// values. Out-of-range values are clamped rather than rejected.
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Pagination {
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Wrap one page of items together with the total count.
    pub fn paginate<T>(self, total: u64, items: Vec<T>) -> Paginated<T> {
        let pages = (total + u64::from(self.limit) - 1) / u64::from(self.limit);
        Paginated {
            items,
            total,
            page: self.page,
            pages,
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Pagination {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let page = match req.query_value::<u32>("page").unwrap_or(Ok(1)) {
            Ok(page) => page.max(1),
            Err(_) => return request::Outcome::Failure((Status::BadRequest, ())),
        };
        let limit = match req
            .query_value::<u32>("limit")
            .unwrap_or(Ok(DEFAULT_PAGE_SIZE))
        {
            Ok(limit) => limit.clamp(1, MAX_PAGE_SIZE),
            Err(_) => return request::Outcome::Failure((Status::BadRequest, ())),
        };
        request::Outcome::Success(Self { page, limit })
    }
}

/// One page of results.
#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub pages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_counts_from_page_one() {
        let pagination = Pagination { page: 1, limit: 10 };
        assert_eq!(pagination.skip(), 0);

        let pagination = Pagination { page: 3, limit: 25 };
        assert_eq!(pagination.skip(), 50);
    }

    #[test]
    fn page_count_rounds_up() {
        let pagination = Pagination { page: 1, limit: 10 };
        let result = pagination.paginate(21, vec![0; 10]);
        assert_eq!(result.pages, 3);

        let pagination = Pagination { page: 1, limit: 10 };
        let result = pagination.paginate(20, vec![0; 10]);
        assert_eq!(result.pages, 2);

        let pagination = Pagination { page: 1, limit: 10 };
        let result = pagination.paginate(0, Vec::<u32>::new());
        assert_eq!(result.pages, 0);
    }
}
