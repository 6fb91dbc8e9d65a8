/// Insert payloads that carry server-derived fields and therefore don't map
/// one-to-one onto a request body.

#[derive(Debug, Clone)]
pub struct NewContent {
    pub user_id: String,
    pub user_ip: String,
    pub content: String,
}
