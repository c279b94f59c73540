use std::io;

pub struct Config {
    value: toml::Value,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            value: toml::Value::Table(toml::map::Map::new()),
        }
    }
}

impl Config {
    fn lookup<T: AsRef<str>>(&self, k: T) -> Option<&toml::Value> {
        let mut item = &self.value;
        for key in k.as_ref().split('.') {
            item = item.get(key)?;
        }
        Some(item)
    }

    /// Get an entry by path. If the input argument contains dots, the path is split
    /// into keys, each key being requested recursively.
    pub fn get<T: AsRef<str>>(&self, k: T) -> Option<&str> {
        self.lookup(k)?.as_str()
    }

    /// Get an entry of type integer by path
    pub fn get_usize<T: AsRef<str>>(&self, k: T) -> Option<usize> {
        self.lookup(k)?
            .as_integer()
            .and_then(|i| if i >= 0 { Some(i as usize) } else { None })
    }

    /// Get an entry of type boolean by path
    pub fn get_bool<T: AsRef<str>>(&self, k: T) -> Option<bool> {
        self.lookup(k)?.as_bool()
    }

    /// Set an entry by path, creating intermediate tables if needed.
    ///
    /// Returns `false` if a non-table value is found on the path.
    pub fn set<T: AsRef<str>, V: Into<toml::Value>>(&mut self, k: T, v: V) -> bool {
        let keys: Vec<&str> = k.as_ref().split('.').collect();
        let (last, path) = match keys.split_last() {
            Some(s) => s,
            None => return false,
        };
        let mut item = &mut self.value;
        for key in path {
            let table = match item.as_table_mut() {
                Some(t) => t,
                None => return false,
            };
            item = table
                .entry(key.to_string())
                .or_insert(toml::Value::Table(toml::map::Map::new()));
        }
        match item.as_table_mut() {
            Some(table) => {
                table.insert(last.to_string(), v.into());
                true
            }
            None => false,
        }
    }

    /// Load configuration from input object, replacing the current values
    pub fn load_config<R: io::Read>(&mut self, mut config: R) -> Result<(), io::Error> {
        let mut s = String::new();
        config.read_to_string(&mut s)?;
        match toml::from_str::<toml::Table>(&s) {
            Ok(table) => {
                self.value = toml::Value::Table(table);
                Ok(())
            }
            Err(e) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Load configuration failed: {e}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    const CONFIG: &str = r#"
buffer_size = 4096

[report]
enabled = false

[live]
interface = "eth0"
snaplen = -1
"#;

    #[test]
    fn config_load_and_get() {
        let mut config = Config::default();
        config.load_config(CONFIG.as_bytes()).expect("load config");
        assert_eq!(config.get_usize("buffer_size"), Some(4096));
        assert_eq!(config.get_bool("report.enabled"), Some(false));
        assert_eq!(config.get("live.interface"), Some("eth0"));
        // negative integers are not valid sizes
        assert_eq!(config.get_usize("live.snaplen"), None);
        assert_eq!(config.get("live.missing"), None);
        assert_eq!(config.get_bool("live.interface"), None);
    }

    #[test]
    fn config_set_overrides() {
        let mut config = Config::default();
        assert!(config.set("live.interface", "lo"));
        assert!(config.set("live.promisc", true));
        assert!(config.set("buffer_size", 1500u32));
        assert_eq!(config.get("live.interface"), Some("lo"));
        assert_eq!(config.get_bool("live.promisc"), Some(true));
        assert_eq!(config.get_usize("buffer_size"), Some(1500));
        // cannot descend into a non-table value
        assert!(!config.set("buffer_size.inner", 1u32));
    }

    #[test]
    fn config_invalid() {
        let mut config = Config::default();
        assert!(config.load_config("not = [valid".as_bytes()).is_err());
    }
}
