// Credential resolution from the process environment
//
// Kept in its own test binary, and in a single test, because it mutates
// process-wide environment variables.

use meta_ads_gateway::{
    auth::{AuthManager, ACCESS_TOKEN_ENV, API_VERSION_ENV, DEFAULT_API_VERSION, GRAPH_HOST_ENV},
    error::Error,
};

#[test]
fn test_from_environment() {
    std::env::remove_var(ACCESS_TOKEN_ENV);
    std::env::remove_var(API_VERSION_ENV);
    std::env::remove_var(GRAPH_HOST_ENV);

    let result = AuthManager::from_environment();
    match result {
        Err(Error::Configuration(message)) => assert!(message.contains(ACCESS_TOKEN_ENV)),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("resolution must fail without a token"),
    }

    std::env::set_var(ACCESS_TOKEN_ENV, "EAAB-env");
    let auth = AuthManager::from_environment().unwrap();
    assert_eq!(auth.get_access_token(), "EAAB-env");
    assert_eq!(auth.get_api_version(), DEFAULT_API_VERSION);
    assert_eq!(auth.get_base_url(), "https://graph.facebook.com/v24.0");

    std::env::set_var(API_VERSION_ENV, "v23.0");
    std::env::set_var(GRAPH_HOST_ENV, "http://localhost:9999/");
    let auth = AuthManager::from_environment().unwrap();
    assert_eq!(auth.get_api_version(), "v23.0");
    assert_eq!(auth.get_base_url(), "http://localhost:9999/v23.0");

    // Malformed version falls back rather than failing
    std::env::set_var(API_VERSION_ENV, "latest");
    let auth = AuthManager::from_environment().unwrap();
    assert_eq!(auth.get_api_version(), DEFAULT_API_VERSION);

    std::env::remove_var(ACCESS_TOKEN_ENV);
    std::env::remove_var(API_VERSION_ENV);
    std::env::remove_var(GRAPH_HOST_ENV);
}
