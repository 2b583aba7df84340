use std::{
    env::VarError,
    ffi::OsString,
    io,
    net::{IpAddr, Ipv4Addr},
};

use thiserror::Error;

use crate::{Error, Result, node::hash_node_id};

/// Explicit node id override, decimal `0..=65535`.
pub const NODE_ID_VAR: &str = "NODEFLAKE_NODE_ID";

/// Workload instance name, typically injected by the orchestrator.
pub const WORKLOAD_NAME_VAR: &str = "POD_NAME";

/// Host-name-style fallback variable.
pub const HOSTNAME_VAR: &str = "HOSTNAME";

/// Terminal failure of the address layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AddressError {
    /// No interface carries a private or link-local IPv4 address.
    #[error("no private IPv4 address found")]
    NoPrivateAddress,

    /// The interface list could not be read.
    #[error("failed to list network interfaces: {0}")]
    Interfaces(#[from] io::Error),
}

/// Which signal produced a node id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeIdSource {
    /// [`NODE_ID_VAR`]
    Explicit,
    /// [`WORKLOAD_NAME_VAR`], hashed
    WorkloadName,
    /// [`HOSTNAME_VAR`], hashed
    HostnameVar,
    /// The OS host name, hashed
    OsHostname,
    /// Low 16 bits of a private IPv4 address
    PrivateAddress,
    /// A caller-supplied function
    Override,
}

impl NodeIdSource {
    /// Returns `true` only for sources that guarantee fleet-wide uniqueness
    /// when the operator assigns them correctly.
    pub fn is_authoritative(&self) -> bool {
        matches!(self, Self::Explicit | Self::Override)
    }
}

/// A resolved node id together with the signal it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeIdentity {
    pub id: u16,
    pub source: NodeIdSource,
}

/// One address on a network interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceAddr {
    pub name: String,
    pub ip: IpAddr,
    pub loopback: bool,
}

/// The environment signals consulted during resolution.
///
/// [`SystemSignals`] reads the real process environment; tests supply their
/// own implementation.
pub trait NodeSignals {
    /// Returns the value of an environment variable, with the same
    /// contract as [`std::env::var`].
    ///
    /// # Errors
    ///
    /// [`VarError::NotPresent`] if the variable is unset and
    /// [`VarError::NotUnicode`] if its value is not valid UTF-8.
    fn var(&self, name: &str) -> Result<String, VarError>;

    /// Returns the OS host name.
    ///
    /// # Errors
    ///
    /// Returns the system error if the host name cannot be read.
    fn hostname(&self) -> io::Result<String>;

    /// Lists the addresses of every network interface.
    ///
    /// # Errors
    ///
    /// Returns the system error if the interfaces cannot be enumerated.
    fn interface_addrs(&self) -> io::Result<Vec<InterfaceAddr>>;
}

/// [`NodeSignals`] backed by the process environment, the `hostname` crate
/// and the `if-addrs` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemSignals;

impl NodeSignals for SystemSignals {
    fn var(&self, name: &str) -> Result<String, VarError> {
        std::env::var(name)
    }

    fn hostname(&self) -> io::Result<String> {
        hostname::get()?.into_string().map_err(|raw| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("host name is not valid UTF-8: {raw:?}"),
            )
        })
    }

    fn interface_addrs(&self) -> io::Result<Vec<InterfaceAddr>> {
        Ok(if_addrs::get_if_addrs()?
            .into_iter()
            .map(|iface| InterfaceAddr {
                ip: iface.ip(),
                loopback: iface.is_loopback(),
                name: iface.name,
            })
            .collect())
    }
}

/// Resolves the node id from the process environment.
///
/// # Errors
///
/// - [`Error::InvalidNodeId`] if [`NODE_ID_VAR`] is set but malformed
/// - [`Error::NodeUnresolved`] if no signal is available
pub fn resolve_node_id() -> Result<u16> {
    resolve_node_identity_with(&SystemSignals).map(|node| node.id)
}

/// Resolves the node id from `signals`, reporting which signal was used.
///
/// # Errors
///
/// - [`Error::InvalidNodeId`] if [`NODE_ID_VAR`] is set but malformed
/// - [`Error::NodeUnresolved`] if no signal is available; it carries the host
///   name failure and the address failure
pub fn resolve_node_identity_with<S>(signals: &S) -> Result<NodeIdentity>
where
    S: NodeSignals + ?Sized,
{
    let found = |id, source| Ok(NodeIdentity { id, source });

    let explicit = present(signals.var(NODE_ID_VAR)).map_err(|raw| Error::InvalidNodeId {
        var: NODE_ID_VAR,
        value: raw.to_string_lossy().into_owned(),
    })?;
    if let Some(raw) = explicit {
        let id = raw.parse::<u16>().map_err(|_| Error::InvalidNodeId {
            var: NODE_ID_VAR,
            value: raw.clone(),
        })?;
        return found(id, NodeIdSource::Explicit);
    }

    // Names that are not UTF-8 cannot be hashed consistently; skip them.
    if let Ok(Some(name)) = present(signals.var(WORKLOAD_NAME_VAR)) {
        return found(hash_node_id(&name), NodeIdSource::WorkloadName);
    }

    if let Ok(Some(name)) = present(signals.var(HOSTNAME_VAR)) {
        return found(hash_node_id(&name), NodeIdSource::HostnameVar);
    }

    let hostname_failure = match signals.hostname() {
        Ok(name) if !name.is_empty() => {
            return found(hash_node_id(&name), NodeIdSource::OsHostname);
        }
        Ok(_) => "empty host name".to_owned(),
        Err(e) => e.to_string(),
    };

    match private_ipv4_node_id(signals) {
        Ok(id) => found(id, NodeIdSource::PrivateAddress),
        Err(source) => Err(Error::NodeUnresolved {
            hostname: hostname_failure,
            source,
        }),
    }
}

fn private_ipv4_node_id<S>(signals: &S) -> Result<u16, AddressError>
where
    S: NodeSignals + ?Sized,
{
    signals
        .interface_addrs()?
        .into_iter()
        .filter(|addr| !addr.loopback)
        .find_map(|addr| match addr.ip {
            IpAddr::V4(ip) if is_private_ipv4(ip) => Some(low_16_bits(ip)),
            _ => None,
        })
        .ok_or(AddressError::NoPrivateAddress)
}

/// RFC 1918 private ranges plus RFC 3927 link-local.
pub fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    ip.is_private() || ip.is_link_local()
}

fn low_16_bits(ip: Ipv4Addr) -> u16 {
    let [_, _, hi, lo] = ip.octets();
    u16::from_be_bytes([hi, lo])
}

/// Collapses unset and empty variables into `None`, keeping the raw value of
/// a variable that is set but not UTF-8.
pub(crate) fn present(value: Result<String, VarError>) -> Result<Option<String>, OsString> {
    match value {
        Ok(v) if v.is_empty() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(raw)) => Err(raw),
    }
}
