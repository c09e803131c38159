//! Data object storing the gateway process configuration.
use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

/// Global configuration for the gateway process.
///
/// Services are keyed by name under `services.<service-name>` per `spec.md` §6, mirroring the
/// shape read by `examples/original_source/rethink-persist/rethink-persist.go` from its process
/// wide config object (`config.services.<name>.*`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Conf {
    /// Per-service document database configuration, keyed by service name.
    #[serde(default)]
    pub services: HashMap<String, ServiceConf>,
}

impl Conf {
    /// Look up the configuration for the given service name, if any.
    pub fn service(&self, name: &str) -> Option<&ServiceConf> {
        self.services.get(name)
    }
}

/// Document database connection options for one service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceConf {
    /// Address of the document database to connect to.
    #[serde(rename = "rethink-host", default = "ServiceConf::default_host")]
    pub rethink_host: String,

    /// Name of the target database this gateway is allowed to query.
    #[serde(rename = "rethink-db", default = "ServiceConf::default_db")]
    pub rethink_db: String,

    /// Drop and recreate the target database at startup.
    #[serde(default)]
    pub reset: bool,
}

impl ServiceConf {
    fn default_host() -> String {
        "localhost:28015".into()
    }

    fn default_db() -> String {
        "persist".into()
    }
}

impl Default for ServiceConf {
    fn default() -> Self {
        ServiceConf {
            rethink_host: Self::default_host(),
            rethink_db: Self::default_db(),
            reset: false,
        }
    }
}
