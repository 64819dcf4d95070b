use near_sdk::{bs58, env, AccountId, CryptoHash};

// Helper for consistent logging
pub fn log_htlc_event(event: &str, actor: &AccountId, details: &str) {
    env::log_str(&format!("HTLC_{}: actor='{}', {}", event, actor, details));
}

pub fn encode_hash(hash: &CryptoHash) -> String {
    bs58::encode(hash).into_string()
}
