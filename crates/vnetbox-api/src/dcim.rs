// dcim endpoints: manufacturers, device types, device roles, sites,
// devices, and interfaces.
//
// Reference objects (manufacturer/type/role/site) are looked up by slug,
// which NetBox enforces as unique per model.

use tracing::debug;

use crate::client::NetboxClient;
use crate::error::Error;
use crate::types::{
    Device, DeviceRole, DeviceType, Interface, Manufacturer, NewDevice, NewDeviceRole,
    NewDeviceType, NewInterface, NewManufacturer, NewSite, Site,
};

impl NetboxClient {
    // ── Manufacturers ────────────────────────────────────────────────

    /// `GET /api/dcim/manufacturers/?slug={slug}`
    pub async fn find_manufacturer(&self, slug: &str) -> Result<Option<Manufacturer>, Error> {
        self.find_one("dcim/manufacturers/", &[("slug", slug.to_owned())])
            .await
    }

    /// `POST /api/dcim/manufacturers/`
    pub async fn create_manufacturer(
        &self,
        manufacturer: &NewManufacturer,
    ) -> Result<Manufacturer, Error> {
        debug!(slug = %manufacturer.slug, "creating manufacturer");
        self.post("dcim/manufacturers/", manufacturer).await
    }

    // ── Device types ─────────────────────────────────────────────────

    /// `GET /api/dcim/device-types/?slug={slug}`
    pub async fn find_device_type(&self, slug: &str) -> Result<Option<DeviceType>, Error> {
        self.find_one("dcim/device-types/", &[("slug", slug.to_owned())])
            .await
    }

    /// `POST /api/dcim/device-types/`
    pub async fn create_device_type(&self, device_type: &NewDeviceType) -> Result<DeviceType, Error> {
        debug!(model = %device_type.model, "creating device type");
        self.post("dcim/device-types/", device_type).await
    }

    // ── Device roles ─────────────────────────────────────────────────

    /// `GET /api/dcim/device-roles/?slug={slug}`
    pub async fn find_device_role(&self, slug: &str) -> Result<Option<DeviceRole>, Error> {
        self.find_one("dcim/device-roles/", &[("slug", slug.to_owned())])
            .await
    }

    /// `POST /api/dcim/device-roles/`
    pub async fn create_device_role(&self, role: &NewDeviceRole) -> Result<DeviceRole, Error> {
        debug!(name = %role.name, "creating device role");
        self.post("dcim/device-roles/", role).await
    }

    // ── Sites ────────────────────────────────────────────────────────

    /// `GET /api/dcim/sites/?slug={slug}`
    pub async fn find_site(&self, slug: &str) -> Result<Option<Site>, Error> {
        self.find_one("dcim/sites/", &[("slug", slug.to_owned())])
            .await
    }

    /// `POST /api/dcim/sites/`
    pub async fn create_site(&self, site: &NewSite) -> Result<Site, Error> {
        debug!(name = %site.name, "creating site");
        self.post("dcim/sites/", site).await
    }

    // ── Devices ──────────────────────────────────────────────────────

    /// Device names are unique per site, so this returns at most one.
    ///
    /// `GET /api/dcim/devices/?name={name}&site_id={site_id}`
    pub async fn find_device(&self, name: &str, site_id: u64) -> Result<Option<Device>, Error> {
        self.find_one(
            "dcim/devices/",
            &[("name", name.to_owned()), ("site_id", site_id.to_string())],
        )
        .await
    }

    /// `POST /api/dcim/devices/`
    pub async fn create_device(&self, device: &NewDevice) -> Result<Device, Error> {
        debug!(name = %device.name, site = device.site, "creating device");
        self.post("dcim/devices/", device).await
    }

    // ── Interfaces ───────────────────────────────────────────────────

    /// `GET /api/dcim/interfaces/?device_id={device_id}&name={name}`
    pub async fn find_interface(&self, device_id: u64, name: &str) -> Result<Option<Interface>, Error> {
        self.find_one(
            "dcim/interfaces/",
            &[("device_id", device_id.to_string()), ("name", name.to_owned())],
        )
        .await
    }

    /// `POST /api/dcim/interfaces/`
    pub async fn create_interface(&self, interface: &NewInterface) -> Result<Interface, Error> {
        debug!(device = interface.device, name = %interface.name, "creating interface");
        self.post("dcim/interfaces/", interface).await
    }
}
