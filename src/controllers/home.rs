#[tracing::instrument(name = "[GET] /")]
pub async fn index() -> &'static str {
    "Alive"
}
