use anyhow::Result;
use clap::Args;

use crate::constants::VERSION;

#[derive(Args, Debug)]
pub struct VersionCommand {}

impl VersionCommand {
    pub fn execute(self) -> Result<()> {
        println!("{}", version_string());
        Ok(())
    }
}

fn version_string() -> String {
    format!("v{VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string() {
        assert_eq!(version_string(), format!("v{}", env!("CARGO_PKG_VERSION")));
        assert!(semver::Version::parse(&version_string()[1..]).is_ok());
    }
}
