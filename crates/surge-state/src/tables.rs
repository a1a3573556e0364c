//! redb table definitions for the Surge object store.
//!
//! One table per object kind. Keys are `{namespace}/{name}`, values are
//! JSON-serialized objects.

use redb::TableDefinition;

/// Table type shared by every object kind.
pub type ObjectTable = TableDefinition<'static, &'static str, &'static [u8]>;

pub const REVISIONS: ObjectTable = TableDefinition::new("revisions");

pub const DEPLOYMENTS: ObjectTable = TableDefinition::new("deployments");

pub const SERVICES: ObjectTable = TableDefinition::new("services");

/// Observed only; written by the cluster, never by the reconciler.
pub const ENDPOINTS: ObjectTable = TableDefinition::new("endpoints");

pub const IMAGES: ObjectTable = TableDefinition::new("images");

pub const CONFIG_MAPS: ObjectTable = TableDefinition::new("config_maps");

pub const POD_AUTOSCALERS: ObjectTable = TableDefinition::new("pod_autoscalers");

pub const HORIZONTAL_POD_AUTOSCALERS: ObjectTable =
    TableDefinition::new("horizontal_pod_autoscalers");

/// Observed only; builds are tracked, not owned.
pub const BUILDS: ObjectTable = TableDefinition::new("builds");

/// Every table, for creation on open.
pub const ALL: [ObjectTable; 9] = [
    REVISIONS,
    DEPLOYMENTS,
    SERVICES,
    ENDPOINTS,
    IMAGES,
    CONFIG_MAPS,
    POD_AUTOSCALERS,
    HORIZONTAL_POD_AUTOSCALERS,
    BUILDS,
];
