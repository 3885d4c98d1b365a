use rocket::{
    http::Status,
    response::status::Custom,
    serde::json::Json,
    Catcher, Request, Route,
};

use crate::error::ErrorBody;

mod candidates;
mod elections;
mod eligibility;
mod stats;
mod users;
mod votes;

#[cfg(test)]
pub(crate) mod testing;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(elections::routes());
    routes.extend(candidates::routes());
    routes.extend(eligibility::routes());
    routes.extend(votes::routes());
    routes.extend(stats::routes());
    routes.extend(users::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Give every failure a JSON body, including those that never reached a handler
/// (unknown routes, rejected guards, unparseable bodies).
#[catch(default)]
fn default_catcher(status: Status, req: &Request<'_>) -> Custom<Json<ErrorBody>> {
    let error = match status.code {
        400 | 422 => "INVALID_ARGUMENT",
        401 => "UNAUTHORIZED",
        403 => "PERMISSION_DENIED",
        404 => "NOT_FOUND",
        409 => "CONFLICT",
        412 => "FAILED_PRECONDITION",
        _ => "INTERNAL",
    };
    let message = match status.reason() {
        Some(reason) => format!("{reason}: {} {}", req.method(), req.uri()),
        None => format!("{} {}", req.method(), req.uri()),
    };
    Custom(
        status,
        Json(ErrorBody {
            error: error.to_string(),
            message,
        }),
    )
}

#[cfg(test)]
mod tests {
    use rocket::{http::Status, local::asynchronous::Client};

    use crate::error::ErrorBody;

    #[backend_test]
    async fn unknown_route_is_json(client: Client) {
        let response = client.get("/nowhere").dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let body: ErrorBody = response.into_json().await.unwrap();
        assert_eq!(body.error, "NOT_FOUND");
    }

    #[backend_test]
    async fn anonymous_is_unauthorized(client: Client) {
        let response = client.get("/elections").dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
        let body: ErrorBody = response.into_json().await.unwrap();
        assert_eq!(body.error, "UNAUTHORIZED");
    }
}
