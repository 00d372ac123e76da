// ipam endpoints: prefixes and IP addresses.
//
// Prefix lookups return every match: the same CIDR may legitimately
// exist once per VRF, and the caller decides how to treat ambiguity.

use tracing::debug;

use crate::client::NetboxClient;
use crate::error::Error;
use crate::types::{
    IpAddress, IpAddressAssignment, NewIpAddress, Prefix, PrefixPatch, WritablePrefix,
};

impl NetboxClient {
    /// All prefix records whose value equals `cidr`, across VRFs.
    ///
    /// `GET /api/ipam/prefixes/?prefix={cidr}`
    pub async fn list_prefixes(&self, cidr: &str) -> Result<Vec<Prefix>, Error> {
        self.list_all("ipam/prefixes/", &[("prefix", cidr.to_owned())])
            .await
    }

    /// `POST /api/ipam/prefixes/`
    pub async fn create_prefix(&self, prefix: &WritablePrefix) -> Result<Prefix, Error> {
        debug!(cidr = %prefix.prefix, "creating prefix");
        self.post("ipam/prefixes/", prefix).await
    }

    /// `PATCH /api/ipam/prefixes/{id}/`
    pub async fn update_prefix(&self, id: u64, patch: &PrefixPatch) -> Result<Prefix, Error> {
        debug!(id, "updating prefix");
        self.patch(&format!("ipam/prefixes/{id}/"), patch).await
    }

    /// All IP address records equal to `address` (with mask).
    ///
    /// `GET /api/ipam/ip-addresses/?address={address}`
    pub async fn list_ip_addresses(&self, address: &str) -> Result<Vec<IpAddress>, Error> {
        self.list_all("ipam/ip-addresses/", &[("address", address.to_owned())])
            .await
    }

    /// `POST /api/ipam/ip-addresses/`
    pub async fn create_ip_address(&self, address: &NewIpAddress) -> Result<IpAddress, Error> {
        debug!(address = %address.address, "creating IP address");
        self.post("ipam/ip-addresses/", address).await
    }

    /// Move an address to a different interface, or detach it.
    ///
    /// `PATCH /api/ipam/ip-addresses/{id}/`
    pub async fn assign_ip_address(
        &self,
        id: u64,
        assignment: &IpAddressAssignment,
    ) -> Result<IpAddress, Error> {
        debug!(
            id,
            interface = ?assignment.assigned_object_id,
            "reassigning IP address"
        );
        self.patch(&format!("ipam/ip-addresses/{id}/"), assignment)
            .await
    }
}
