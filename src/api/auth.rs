use mongodb::bson::doc;
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::auth::{
            AuthToken, LoginRequest, LoginResponse, ProfileResponse, RegisterRequest,
            RegisterResponse, UserDetails,
        },
        db::user::{NewUser, User, UserCore},
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![register, login, profile]
}

#[post("/auth/register", data = "<request>", format = "json")]
async fn register(
    request: Json<RegisterRequest>,
    users: Coll<User>,
    new_users: Coll<NewUser>,
    config: &State<Config>,
) -> Result<(Status, Json<RegisterResponse>)> {
    let request = request.into_inner();
    if request.name.is_empty() || request.email.is_empty() || request.password.is_empty() {
        return Err(Error::bad_request(
            "Name, email, and password are required",
        ));
    }

    // Friendly pre-check; the unique email index is the backstop.
    let with_email = doc! { "email": &request.email };
    if users.find_one(with_email, None).await?.is_some() {
        return Err(Error::conflict("Email already registered"));
    }

    let user = UserCore::new(request.name, request.email, request.password, request.role)?;
    let new_id: Id = match new_users.insert_one(&user, None).await {
        Ok(result) => result
            .inserted_id
            .as_object_id()
            .unwrap() // Valid because the ID comes directly from the database.
            .into(),
        Err(err) if is_duplicate_key_error(&err) => {
            return Err(Error::conflict("Email already registered"));
        }
        Err(err) => return Err(err.into()),
    };

    let token = AuthToken {
        id: new_id,
        role: user.role,
    };

    Ok((
        Status::Created,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            role: user.role,
            token: token.sign(config),
        }),
    ))
}

#[post("/auth/login", data = "<request>", format = "json")]
async fn login(
    request: Json<LoginRequest>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<Json<LoginResponse>> {
    let with_email = doc! { "email": &request.email };
    let user = users
        .find_one(with_email, None)
        .await?
        .ok_or_else(|| Error::unauthorized("User not found"))?;

    if !user.verify_password(&request.password) {
        return Err(Error::unauthorized("Invalid credentials"));
    }

    let token = AuthToken::for_user(&user);
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user: UserDetails::from(&user),
        token: token.sign(config),
    }))
}

#[get("/auth/profile")]
async fn profile(token: AuthToken, users: Coll<User>) -> Result<Json<ProfileResponse>> {
    let user = users
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found("User"))?;

    Ok(Json(ProfileResponse {
        name: user.user.name,
        email: user.user.email,
        role: user.user.role,
    }))
}
