use std::path::PathBuf;

use anyhow::anyhow;
use argh::FromArgs;
use serde_json::{from_str, from_value, to_value, Value};
use snsd_config::Config;

#[derive(Debug, Clone, FromArgs)]
#[argh(description = "Service-node state engine daemon")]
pub struct Args {
    /// path to configuration
    #[argh(option, short = 'c')]
    pub config: PathBuf,

    /// datadir path that will contain persisted state snapshots
    #[argh(option, short = 'd')]
    pub datadir: Option<PathBuf>,

    /// rpc bind host
    #[argh(option)]
    pub rpc_host: Option<String>,

    /// rpc bind port
    #[argh(option)]
    pub rpc_port: Option<u16>,

    /// generic config overrides, in `path.to.field=value` JSON-value form
    #[argh(option, short = 'o')]
    pub overrides: Vec<String>,
}

impl Args {
    pub fn override_config(&self, config: &mut Config) -> anyhow::Result<bool> {
        let mut overridden = self.override_generic(config)?;

        if let Some(datadir) = &self.datadir {
            config.datadir.datadir = datadir.clone();
            overridden = true;
        }
        if let Some(rpc_host) = &self.rpc_host {
            config.rpc.bind_host = rpc_host.clone();
            overridden = true;
        }
        if let Some(rpc_port) = &self.rpc_port {
            config.rpc.bind_port = *rpc_port;
            overridden = true;
        }
        Ok(overridden)
    }

    /// Override config using the generic `key.path=value` overrides.
    fn override_generic(&self, config: &mut Config) -> anyhow::Result<bool> {
        let original = config.clone();
        let mut json_config = to_value(&mut *config).expect("config json serialization failed");

        for (path, val) in parse_overrides(&self.overrides)?.iter() {
            apply_override(path, val, &mut json_config)?;
        }
        *config =
            from_value(json_config).expect("should be able to create Config from serde json Value");
        Ok(original != *config)
    }
}

type Override = (Vec<String>, String);

fn parse_overrides(overrides: &[String]) -> anyhow::Result<Vec<Override>> {
    let mut result = Vec::new();
    for item in overrides {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid override: must be in 'key=value' format"))?;
        let path: Vec<_> = key.split('.').map(|x| x.to_string()).collect();
        result.push((path, value.to_string()));
    }
    Ok(result)
}

fn apply_override(path: &[String], str_value: &str, config: &mut Value) -> anyhow::Result<()> {
    match path {
        [key] => {
            config[key] = from_str(str_value)?;
        }
        [key, other @ ..] => {
            apply_override(other, str_value, &mut config[key])?;
        }
        [] => return Err(anyhow!("invalid override path")),
    };
    Ok(())
}

#[cfg(test)]
mod test {
    use snsd_config::{DataDirConfig, NetworkConfig, PulseTimingOverrides, RpcConfig};

    use super::*;

    fn get_config() -> Config {
        Config {
            network: NetworkConfig::Testnet,
            datadir: DataDirConfig {
                datadir: "".into(),
                node_key_path: "".into(),
            },
            rpc: RpcConfig {
                bind_host: "".to_string(),
                bind_port: 300,
            },
            pulse_timing: PulseTimingOverrides::default(),
            max_short_term_history: 200,
        }
    }

    #[test]
    fn test_generic_override() {
        let mut config = get_config();
        let args = Args {
            config: "config_path".into(),
            datadir: None,
            rpc_host: None,
            rpc_port: None,
            overrides: vec![
                "pulse_timing.round_timeout_secs=30".to_string(),
                "max_short_term_history=999".to_string(),
            ],
        };

        assert_ne!(config.pulse_timing.round_timeout_secs, Some(30));
        assert_ne!(config.max_short_term_history, 999);

        args.override_config(&mut config).unwrap();

        assert_eq!(config.pulse_timing.round_timeout_secs, Some(30));
        assert_eq!(config.max_short_term_history, 999);
    }

    #[test]
    fn test_direct_field_overrides() {
        let mut config = get_config();
        let args = Args {
            config: "config_path".into(),
            datadir: Some("/new/datadir".into()),
            rpc_host: Some("0.0.0.0".to_string()),
            rpc_port: Some(9999),
            overrides: vec![],
        };

        args.override_config(&mut config).unwrap();

        assert_eq!(config.datadir.datadir, PathBuf::from("/new/datadir"));
        assert_eq!(config.rpc.bind_host, "0.0.0.0");
        assert_eq!(config.rpc.bind_port, 9999);
    }
}
