// ── NetBox-backed inventory ──

use async_trait::async_trait;
use ipnet::IpNet;
use tracing::debug;

use vnetbox_api::transport::TlsMode;
use vnetbox_api::types::{
    IpAddressAssignment, NewCustomField, NewDeviceRole, NewDeviceType, NewManufacturer, NewSite,
    NewTag,
};
use vnetbox_api::{NetboxClient, TransportConfig};

use super::convert::INTERFACE_OBJECT_TYPE;
use super::{
    AddressSpec, CustomFieldSpec, DeviceSpec, Inventory, InterfaceSpec, PrefixChanges,
    PrefixSpec, RefKind, RefSpec,
};
use crate::config::{ConnectionConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{ObjectRef, TargetAddress, TargetDevice, TargetInterface, TargetPrefix};

/// [`Inventory`] over the NetBox REST API.
pub struct NetboxInventory {
    client: NetboxClient,
}

impl NetboxInventory {
    /// Build the HTTP client from connection settings. No request is made.
    pub fn connect(config: &ConnectionConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: tls_to_transport(&config.tls),
            timeout: config.timeout,
        };
        let client = NetboxClient::new(config.url.as_str(), &config.token, &transport)?;
        debug!(url = %client.base_url(), "NetBox client ready");
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: NetboxClient) -> Self {
        Self { client }
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

fn tag_ids(tags: &std::collections::BTreeSet<u64>) -> Vec<vnetbox_api::types::IdRef> {
    tags.iter().copied().map(Into::into).collect()
}

#[async_trait]
impl Inventory for NetboxInventory {
    async fn find_ref(&self, kind: RefKind, slug: &str) -> Result<Option<ObjectRef>, CoreError> {
        let found = match kind {
            RefKind::Tag => self.client.find_tag(slug).await?.map(ObjectRef::from),
            RefKind::Manufacturer => self
                .client
                .find_manufacturer(slug)
                .await?
                .map(ObjectRef::from),
            RefKind::DeviceType => self
                .client
                .find_device_type(slug)
                .await?
                .map(ObjectRef::from),
            RefKind::DeviceRole => self
                .client
                .find_device_role(slug)
                .await?
                .map(ObjectRef::from),
            RefKind::Site => self.client.find_site(slug).await?.map(ObjectRef::from),
        };
        Ok(found)
    }

    async fn create_ref(&self, spec: &RefSpec) -> Result<ObjectRef, CoreError> {
        let created = match spec {
            RefSpec::Tag {
                name,
                slug,
                description,
            } => self
                .client
                .create_tag(&NewTag {
                    name: name.clone(),
                    slug: slug.clone(),
                    description: description.clone(),
                })
                .await?
                .into(),
            RefSpec::Manufacturer {
                name,
                slug,
                description,
            } => self
                .client
                .create_manufacturer(&NewManufacturer {
                    name: name.clone(),
                    slug: slug.clone(),
                    description: description.clone(),
                })
                .await?
                .into(),
            RefSpec::DeviceType {
                model,
                slug,
                manufacturer,
                tags,
            } => self
                .client
                .create_device_type(&NewDeviceType {
                    model: model.clone(),
                    slug: slug.clone(),
                    manufacturer: *manufacturer,
                    tags: tag_ids(tags),
                })
                .await?
                .into(),
            RefSpec::DeviceRole {
                name,
                slug,
                vm_role,
                tags,
            } => self
                .client
                .create_device_role(&NewDeviceRole {
                    name: name.clone(),
                    slug: slug.clone(),
                    vm_role: *vm_role,
                    tags: tag_ids(tags),
                })
                .await?
                .into(),
            RefSpec::Site {
                name,
                slug,
                description,
                tags,
            } => self
                .client
                .create_site(&NewSite {
                    name: name.clone(),
                    slug: slug.clone(),
                    status: "active".into(),
                    description: description.clone(),
                    tags: tag_ids(tags),
                })
                .await?
                .into(),
        };
        Ok(created)
    }

    async fn find_custom_field(&self, name: &str) -> Result<Option<u64>, CoreError> {
        Ok(self.client.find_custom_field(name).await?.map(|cf| cf.id))
    }

    async fn create_custom_field(&self, spec: &CustomFieldSpec) -> Result<u64, CoreError> {
        let created = self
            .client
            .create_custom_field(&NewCustomField::from(spec))
            .await?;
        Ok(created.id)
    }

    async fn find_prefixes(&self, cidr: &IpNet) -> Result<Vec<TargetPrefix>, CoreError> {
        self.client
            .list_prefixes(&cidr.to_string())
            .await?
            .into_iter()
            .map(TargetPrefix::try_from)
            .collect()
    }

    async fn create_prefix(&self, spec: &PrefixSpec) -> Result<TargetPrefix, CoreError> {
        let created = self.client.create_prefix(&spec.into()).await?;
        TargetPrefix::try_from(created)
    }

    async fn update_prefix(
        &self,
        current: &TargetPrefix,
        changes: &PrefixChanges,
    ) -> Result<TargetPrefix, CoreError> {
        let updated = self
            .client
            .update_prefix(current.id, &changes.into())
            .await?;
        TargetPrefix::try_from(updated)
    }

    async fn find_device(&self, name: &str, site: u64) -> Result<Option<TargetDevice>, CoreError> {
        Ok(self
            .client
            .find_device(name, site)
            .await?
            .map(TargetDevice::from))
    }

    async fn create_device(&self, spec: &DeviceSpec) -> Result<TargetDevice, CoreError> {
        Ok(self.client.create_device(&spec.into()).await?.into())
    }

    async fn find_interface(
        &self,
        device: u64,
        name: &str,
    ) -> Result<Option<TargetInterface>, CoreError> {
        Ok(self
            .client
            .find_interface(device, name)
            .await?
            .map(TargetInterface::from))
    }

    async fn create_interface(&self, spec: &InterfaceSpec) -> Result<TargetInterface, CoreError> {
        Ok(self.client.create_interface(&spec.into()).await?.into())
    }

    async fn find_addresses(&self, address: &IpNet) -> Result<Vec<TargetAddress>, CoreError> {
        self.client
            .list_ip_addresses(&address.to_string())
            .await?
            .into_iter()
            .map(TargetAddress::try_from)
            .collect()
    }

    async fn create_address(&self, spec: &AddressSpec) -> Result<TargetAddress, CoreError> {
        let created = self.client.create_ip_address(&spec.into()).await?;
        TargetAddress::try_from(created)
    }

    async fn assign_address(
        &self,
        current: &TargetAddress,
        interface: u64,
    ) -> Result<TargetAddress, CoreError> {
        let assignment = IpAddressAssignment::to_object(INTERFACE_OBJECT_TYPE, interface);
        let updated = self
            .client
            .assign_ip_address(current.id, &assignment)
            .await?;
        TargetAddress::try_from(updated)
    }

    async fn unassign_address(&self, current: &TargetAddress) -> Result<TargetAddress, CoreError> {
        let updated = self
            .client
            .assign_ip_address(current.id, &IpAddressAssignment::detached())
            .await?;
        TargetAddress::try_from(updated)
    }
}
