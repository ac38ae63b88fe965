use axum::response::Redirect;

pub const README_URL: &str = "https://github.com/pesu-dev/auth";

#[utoipa::path(
    get,
    path= "/readme",
    responses (
        (status = 307, description = "Redirect to the project README")
    ),
    tag= "documentation"
)]
pub async fn readme() -> Redirect {
    Redirect::temporary(README_URL)
}
