use std::str::FromStr;

pub const MIN_TEXT_LENGTH: usize = 2;
pub const MAX_TEXT_LENGTH: usize = 300;

pub const POST_KEY_PREFIX: &str = "post:";
pub const TOKEN_KEY_PREFIX: &str = "token:";
pub const USER_KEY_PREFIX: &str = "user:";

pub fn post_key(id: &str) -> String {
    format!("{}{}", POST_KEY_PREFIX, id)
}

pub fn token_key(token: &str) -> String {
    format!("{}{}", TOKEN_KEY_PREFIX, token)
}

pub fn user_key(id: &str) -> String {
    format!("{}{}", USER_KEY_PREFIX, id)
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub fn token_expiration_hours() -> i64 {
    env_or("DEVBOARD_TOKEN_EXPIRATION_HOURS", 24)
}

/// How many times a post mutation is re-applied after losing a version race.
pub fn max_update_retries() -> usize {
    env_or("DEVBOARD_MAX_UPDATE_RETRIES", 16usize).max(1)
}

pub fn bind_addr() -> String {
    std::env::var("DEVBOARD_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
}

pub fn seed_dev_data() -> bool {
    env_or("DEVBOARD_SEED_DEV_DATA", true)
}

/// Spin key-value store label; `None` means the component's default store.
pub fn kv_store_label() -> Option<String> {
    std::env::var("DEVBOARD_KV_STORE")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_carry_their_prefix() {
        assert_eq!(post_key("abc"), "post:abc");
        assert_eq!(token_key("t1"), "token:t1");
        assert_eq!(user_key("u1"), "user:u1");
    }

    #[test]
    fn unparsable_values_fall_back_to_default() {
        std::env::set_var("DEVBOARD_TEST_ENV_OR", "not-a-number");
        assert_eq!(env_or("DEVBOARD_TEST_ENV_OR", 7usize), 7);
        std::env::set_var("DEVBOARD_TEST_ENV_OR", " 12 ");
        assert_eq!(env_or("DEVBOARD_TEST_ENV_OR", 7usize), 12);
        std::env::remove_var("DEVBOARD_TEST_ENV_OR");
    }
}
