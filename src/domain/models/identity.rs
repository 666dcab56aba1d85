use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderAccount {
    pub id: String,
    pub email: Option<String>,
}
