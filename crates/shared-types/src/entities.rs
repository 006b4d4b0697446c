//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `GroupId`, `ServiceId`, `Revision`
//! - **Envelope**: `EnvelopeMeta`, `IncomingGroupMessage`
//! - **Group Context**: `GroupContext`, `EmbeddedDelta`, `GroupPlaintext`
//! - **Group State**: `GroupState`, `GroupMembership`, `MemberRole`

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CodecError;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Monotonic version number of a group's membership/state.
pub type Revision = u32;

/// Opaque group identifier. Partition key of the job queue.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct GroupId(pub Vec<u8>);

impl GroupId {
    /// Wrap raw group id bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True for a zero-length id, which is never a valid group.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase hex, used in store keys and log fields.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse the hex form produced by [`GroupId::to_hex`].
    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        hex::decode(s)
            .map(Self)
            .map_err(|e| CodecError::InvalidHex(e.to_string()))
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.to_hex())
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable; ids are usually 32 bytes.
        let hex = self.to_hex();
        if hex.len() > 12 {
            write!(f, "{}…", &hex[..12])
        } else {
            f.write_str(&hex)
        }
    }
}

/// Account-level identity of a message sender or group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceId(pub Uuid);

impl ServiceId {
    /// Generate a random id (tests, demo wiring).
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// CLUSTER B: ENVELOPE
// =============================================================================

/// Envelope metadata carried alongside the decrypted plaintext.
///
/// Opaque to the queue except for the sender, which the discard filter reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EnvelopeMeta {
    /// Sender identity; `None` only if decryption produced a broken envelope.
    pub sender: Option<ServiceId>,
    /// Whether the envelope arrived via sealed sender.
    pub sealed_sender: bool,
    /// Server-assigned envelope guid, if the server provided one.
    pub server_guid: Option<Uuid>,
    /// Client-side send timestamp (milliseconds).
    pub client_timestamp: u64,
}

impl EnvelopeMeta {
    /// Metadata for a known sender with no other fields.
    pub fn from_sender(sender: ServiceId) -> Self {
        Self {
            sender: Some(sender),
            ..Default::default()
        }
    }
}

/// A decrypted group message as handed over by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingGroupMessage {
    /// Target group.
    pub group_id: GroupId,
    /// Decrypted content bytes.
    pub plaintext: Vec<u8>,
    /// Sender metadata.
    pub envelope: EnvelopeMeta,
    /// Server delivery timestamp (milliseconds).
    pub server_timestamp: u64,
}

// =============================================================================
// CLUSTER C: GROUP CONTEXT
// =============================================================================

/// A signed state change carried inside a message.
///
/// Usable only to advance a group from `revision - 1` to `revision`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedDelta {
    /// Revision this change produces.
    pub revision: Revision,
    /// Serialized change actions (opaque to the queue).
    pub change: Vec<u8>,
    /// Server signature over `change`; checked by the oracle, not here.
    pub signature: Vec<u8>,
}

impl EmbeddedDelta {
    /// Cheap shape check done before handing the delta to the oracle.
    ///
    /// Signature verification is the oracle's job.
    pub fn is_structurally_valid(&self, target: Revision) -> bool {
        !self.change.is_empty() && self.revision == target
    }
}

/// Group context embedded in a message plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GroupContext {
    /// Revision the sender had when sending.
    pub revision: Option<Revision>,
    /// Optional change that produced `revision`.
    pub embedded_delta: Option<EmbeddedDelta>,
}

impl GroupContext {
    /// Context asserting `revision` with no embedded change.
    pub fn at(revision: Revision) -> Self {
        Self {
            revision: Some(revision),
            embedded_delta: None,
        }
    }

    /// Attach an embedded change.
    pub fn with_delta(mut self, delta: EmbeddedDelta) -> Self {
        self.embedded_delta = Some(delta);
        self
    }
}

/// Plaintext framing: group context followed by the renderable body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPlaintext {
    /// Group context.
    pub context: GroupContext,
    /// Renderable message body.
    pub body: Vec<u8>,
}

impl GroupPlaintext {
    /// Encode with bincode.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Decode bytes produced by [`GroupPlaintext::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

// =============================================================================
// CLUSTER D: GROUP STATE
// =============================================================================

/// Role flags of a full group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberRole {
    /// Regular member.
    Default,
    /// Administrator; may post in announcements-only groups.
    Administrator,
}

/// Group membership: full members with roles plus pending invitees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GroupMembership {
    full_members: BTreeMap<ServiceId, MemberRole>,
    invited: BTreeSet<ServiceId>,
}

impl GroupMembership {
    /// Empty membership.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a full member.
    #[must_use]
    pub fn with_member(mut self, id: ServiceId, role: MemberRole) -> Self {
        self.add_member(id, role);
        self
    }

    /// Builder: add a pending invitee.
    #[must_use]
    pub fn with_invited(mut self, id: ServiceId) -> Self {
        self.invited.insert(id);
        self
    }

    /// Add or promote a full member. Clears any pending invite.
    pub fn add_member(&mut self, id: ServiceId, role: MemberRole) {
        self.invited.remove(&id);
        self.full_members.insert(id, role);
    }

    /// Remove a member or invitee.
    pub fn remove(&mut self, id: &ServiceId) {
        self.full_members.remove(id);
        self.invited.remove(id);
    }

    /// Full (non-pending) member check.
    pub fn is_full_member(&self, id: &ServiceId) -> bool {
        self.full_members.contains_key(id)
    }

    /// Full member holding the administrator role.
    pub fn is_full_member_and_administrator(&self, id: &ServiceId) -> bool {
        matches!(self.full_members.get(id), Some(MemberRole::Administrator))
    }

    /// Pending invite check.
    pub fn is_invited(&self, id: &ServiceId) -> bool {
        self.invited.contains(id)
    }

    /// Number of full members.
    pub fn full_member_count(&self) -> usize {
        self.full_members.len()
    }
}

/// Snapshot of a group's state as known locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupState {
    /// Group id.
    pub group_id: GroupId,
    /// Current revision; only ever increases.
    pub revision: Revision,
    /// Membership at `revision`.
    pub membership: GroupMembership,
    /// Only administrators may post renderable content.
    pub announcements_only: bool,
}

impl GroupState {
    /// New state at `revision`.
    pub fn new(group_id: GroupId, revision: Revision, membership: GroupMembership) -> Self {
        Self {
            group_id,
            revision,
            membership,
            announcements_only: false,
        }
    }

    /// Builder: toggle announcements-only mode.
    #[must_use]
    pub fn announcements_only(mut self, enabled: bool) -> Self {
        self.announcements_only = enabled;
        self
    }
}
