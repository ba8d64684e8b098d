use clap::Parser;

use crate::error::Result;
use crate::identity::StsEndpointMode;
use crate::vault::{VaultConfig, DEFAULT_MOUNT};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "aws-iam-vault-login")]
#[command(about = "Log in to HashiCorp Vault with AWS IAM credentials")]
#[command(version)]
pub struct Cli {
    /// AWS region we are using (e.g. us-west-1)
    #[arg(short, long)]
    pub region: String,

    /// Vault role we are using
    #[arg(long)]
    pub role: String,

    /// Value for the X-Vault-AWS-IAM-Server-ID header
    #[arg(long)]
    pub host: String,

    /// Print only the client token
    #[arg(long)]
    pub only_token: bool,

    /// Vault address (e.g. https://vault.example.com:8200)
    #[arg(short = 'u', long, env = "VAULT_ADDR")]
    pub vault_addr: String,

    /// Path the aws auth method is mounted at
    #[arg(long, default_value = DEFAULT_MOUNT, env = "VAULT_AWS_AUTH_MOUNT")]
    pub mount: String,

    /// STS endpoint to sign against: `legacy` uses sts.amazonaws.com for legacy regions
    #[arg(
        long,
        value_enum,
        ignore_case = true,
        default_value_t = StsEndpointMode::Legacy,
        env = "AWS_STS_REGIONAL_ENDPOINTS"
    )]
    pub sts_regional_endpoints: StsEndpointMode,
}

impl Cli {
    pub fn vault_config(&self) -> Result<VaultConfig> {
        VaultConfig::new(&self.vault_addr, &self.mount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    const FULL: [&str; 9] = [
        "aws-iam-vault-login",
        "--region",
        "us-west-1",
        "--role",
        "dev-role",
        "--host",
        "vault.example.com",
        "--vault-addr",
        "https://vault.example.com:8200",
    ];

    fn without(flag: &str) -> Vec<&'static str> {
        let mut args = Vec::new();
        let mut iter = FULL.iter();
        while let Some(arg) = iter.next() {
            if *arg == flag {
                iter.next();
            } else {
                args.push(*arg);
            }
        }
        args
    }

    #[test]
    fn test_parses_required_flags() {
        let cli = Cli::try_parse_from(FULL).unwrap();
        assert_eq!(cli.region, "us-west-1");
        assert_eq!(cli.role, "dev-role");
        assert_eq!(cli.host, "vault.example.com");
        assert_eq!(cli.vault_addr, "https://vault.example.com:8200");
        assert!(!cli.only_token);
        assert_eq!(
            cli.vault_config().unwrap().login_url(),
            format!("https://vault.example.com:8200/v1/auth/{}/login", cli.mount)
        );
    }

    #[test]
    fn test_only_token_flag() {
        let mut args = FULL.to_vec();
        args.push("--only-token");
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.only_token);
    }

    #[test]
    fn test_sts_endpoint_mode_defaults_to_legacy() {
        let command = Cli::command();
        let arg = command
            .get_arguments()
            .find(|arg| arg.get_id() == "sts_regional_endpoints")
            .unwrap();
        let defaults: Vec<_> = arg
            .get_default_values()
            .iter()
            .map(|value| value.to_str())
            .collect();
        assert_eq!(defaults, [Some("legacy")]);
        assert_eq!(
            arg.get_env().and_then(|env| env.to_str()),
            Some("AWS_STS_REGIONAL_ENDPOINTS")
        );
    }

    #[test]
    fn test_sts_regional_endpoints_flag() {
        let mut args = FULL.to_vec();
        args.extend(["--sts-regional-endpoints", "regional"]);
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.sts_regional_endpoints, StsEndpointMode::Regional);

        let mut args = FULL.to_vec();
        args.extend(["--sts-regional-endpoints", "LEGACY"]);
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.sts_regional_endpoints, StsEndpointMode::Legacy);
    }

    #[test]
    fn test_missing_role_is_rejected() {
        let err = Cli::try_parse_from(without("--role")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_missing_host_is_rejected() {
        let err = Cli::try_parse_from(without("--host")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_missing_region_is_rejected() {
        let err = Cli::try_parse_from(without("--region")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }
}
