//! Family -> device constructor table used by the factory.

use futures_util::future::BoxFuture;
use indexmap::IndexMap;

use super::{vendors, DeviceHandle, DeviceOptions};
use crate::error::{RegistryError, Result};
use crate::family::Family;
use crate::transport::ConnectorConfig;

/// Builds a device of one family, running its probe and first gather.
pub type Constructor = fn(ConnectorConfig, DeviceOptions) -> BoxFuture<'static, Result<DeviceHandle>>;

/// Registry of device constructors.
///
/// Lookup order follows registration order.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    constructors: IndexMap<Family, Constructor>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DeviceRegistry {
    /// Create a registry with no families.
    pub fn empty() -> Self {
        Self {
            constructors: IndexMap::new(),
        }
    }

    /// Create a registry with every built-in family.
    pub fn builtin() -> Self {
        let builtins: [(Family, Constructor); 6] = [
            (Family::Nxos, vendors::nxos::construct),
            (Family::Eos, vendors::eos::construct),
            (Family::Cumulus, vendors::cumulus::construct),
            (Family::Ubuntu, vendors::ubuntu::construct),
            (Family::Centos, vendors::centos::construct),
            (Family::Opx, vendors::opx::construct),
        ];

        Self {
            constructors: builtins.into_iter().collect(),
        }
    }

    /// Register a constructor.
    pub fn register(&mut self, family: Family, constructor: Constructor) -> Result<()> {
        if self.constructors.contains_key(&family) {
            return Err(RegistryError::AlreadyRegistered {
                name: family.to_string(),
            }
            .into());
        }
        self.constructors.insert(family, constructor);
        Ok(())
    }

    /// Replace the constructor of a family, returning the previous one.
    pub fn replace(&mut self, family: Family, constructor: Constructor) -> Option<Constructor> {
        self.constructors.insert(family, constructor)
    }

    pub fn get(&self, family: Family) -> Result<Constructor> {
        self.constructors.get(&family).copied().ok_or_else(|| {
            RegistryError::UnknownFamily {
                name: family.to_string(),
            }
            .into()
        })
    }

    /// Look a constructor up by family name, ignoring case.
    pub fn lookup(&self, name: &str) -> Result<Constructor> {
        let family: Family = name.parse()?;
        self.get(family)
    }

    pub fn contains(&self, family: Family) -> bool {
        self.constructors.contains_key(&family)
    }

    /// Registered families, in registration order.
    pub fn families(&self) -> impl Iterator<Item = Family> + '_ {
        self.constructors.keys().copied()
    }

    /// Build a device of `family`.
    pub async fn construct(
        &self,
        family: Family,
        config: ConnectorConfig,
        options: DeviceOptions,
    ) -> Result<DeviceHandle> {
        let constructor = self.get(family)?;
        constructor(config, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tokio_test::assert_ok;

    async fn stub() -> Result<DeviceHandle> {
        Err(RegistryError::UnknownFamily {
            name: "stub".to_string(),
        }
        .into())
    }

    fn failing(_: ConnectorConfig, _: DeviceOptions) -> BoxFuture<'static, Result<DeviceHandle>> {
        Box::pin(stub())
    }

    #[test]
    fn test_builtin_has_every_family() {
        let registry = DeviceRegistry::builtin();
        assert_eq!(registry.families().collect::<Vec<_>>(), Family::ALL.to_vec());
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = DeviceRegistry::builtin();
        let err = registry.register(Family::Eos, failing).unwrap_err();
        assert!(matches!(
            err,
            Error::Registry(RegistryError::AlreadyRegistered { ref name }) if name == "eos"
        ));
    }

    #[test]
    fn test_unknown_family() {
        let registry = DeviceRegistry::empty();
        assert!(matches!(
            registry.get(Family::Opx),
            Err(Error::Registry(RegistryError::UnknownFamily { .. }))
        ));
        assert!(matches!(
            registry.lookup("junos"),
            Err(Error::Registry(RegistryError::UnknownFamily { ref name })) if name == "junos"
        ));
    }

    #[tokio::test]
    async fn test_register_and_construct() {
        let mut registry = DeviceRegistry::empty();
        assert_ok!(registry.register(Family::Ubuntu, failing));
        assert!(registry.contains(Family::Ubuntu));
        assert_ok!(registry.lookup("UBUNTU"));

        let config = ConnectorConfig::new("127.0.0.1", "admin", "admin");
        let result = registry
            .construct(Family::Ubuntu, config, DeviceOptions::default())
            .await;
        assert!(matches!(
            result,
            Err(Error::Registry(RegistryError::UnknownFamily { ref name })) if name == "stub"
        ));
    }

    #[tokio::test]
    async fn test_replace_builtin() {
        let mut registry = DeviceRegistry::builtin();
        assert!(registry.replace(Family::Nxos, failing).is_some());

        let config = ConnectorConfig::new("127.0.0.1", "admin", "admin");
        assert!(registry
            .construct(Family::Nxos, config, DeviceOptions::default())
            .await
            .is_err());
    }
}
