mod support;

use support::TestEnv;
use xero_mcp::config::{self, Credential};
use xero_mcp::shared::error::AppError;

#[test]
fn credential_reads_isolated_environment() {
    let _env = TestEnv::new();
    let credential = Credential::from_env().expect("credential");
    assert_eq!(credential.client_id, "test-client-id");
    assert_eq!(credential.client_secret, "test-client-secret");
    assert!(credential
        .scope_string()
        .contains("accounting.reports.read"));
}

#[test]
fn missing_client_secret_is_a_configuration_error() {
    let mut env = TestEnv::new();
    env.remove_var("XERO_CLIENT_SECRET");
    let err = Credential::from_env().expect_err("must fail");
    assert!(matches!(err, AppError::Configuration(_)));
    assert!(err.to_string().contains("XERO_CLIENT_SECRET"));
}

#[test]
fn config_dir_honors_override_and_creates_it() {
    let env = TestEnv::new();
    let dir = config::config_dir().expect("config dir");
    assert_eq!(dir, env.config_dir());
    assert!(dir.is_dir());
}

#[test]
fn config_dir_creates_nested_override() {
    let mut env = TestEnv::new();
    let nested = env.config_dir().join("deep").join("nested");
    let nested_str = nested.to_string_lossy().into_owned();
    env.set_var("XERO_CONFIG_DIR", &nested_str);
    let dir = config::config_dir().expect("config dir");
    assert_eq!(dir, nested);
    assert!(dir.is_dir());
}
