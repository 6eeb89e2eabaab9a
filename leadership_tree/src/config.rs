// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// Sentinel locality used when a roster row does not declare a municipality
/// or a neighborhood.
pub const UNSPECIFIED: &str = "Unspecified";

/// Locality assigned to synthesized nodes, which are not tied to any place.
pub const GLOBAL_SCOPE: &str = "Global";

/// Number of canonical levels in the hierarchy.
pub const NUM_LEVELS: usize = 7;

/// The seven canonical ranks of the leadership hierarchy, from the top of
/// the organization down.
///
/// The declaration order is the parenting order: a node may only be the
/// child of a node with a strictly earlier level.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Level {
    Candidate,
    Leader,
    Level1,
    Level2,
    Level3,
    Level4,
    Level5,
}

impl Level {
    /// All the levels, in canonical order.
    pub const ALL: [Level; NUM_LEVELS] = [
        Level::Candidate,
        Level::Leader,
        Level::Level1,
        Level::Level2,
        Level::Level3,
        Level::Level4,
        Level::Level5,
    ];

    /// Position in the canonical order (candidate = 0).
    pub fn rank(&self) -> usize {
        *self as usize
    }

    pub fn from_rank(rank: usize) -> Option<Level> {
        Level::ALL.get(rank).copied()
    }

    /// Stable lowercase tag used in statistics and in serialized output.
    pub fn label(&self) -> &'static str {
        match self {
            Level::Candidate => "candidate",
            Level::Leader => "leader",
            Level::Level1 => "level1",
            Level::Level2 => "level2",
            Level::Level3 => "level3",
            Level::Level4 => "level4",
            Level::Level5 => "level5",
        }
    }
}

/// One raw roster row, as handed over by the calling layer.
///
/// Any field may be missing or malformed; the classifier is responsible for
/// all the recovery (defaults, skips), never the caller.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RawRow {
    pub name: Option<String>,
    pub level: Option<String>,
    pub municipality: Option<String>,
    pub neighborhood: Option<String>,
    pub votes: Option<String>,
}

// ******** Output data structures *********

/// Why a node was fabricated by the placeholder synthesizer.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum SynthesisReason {
    /// The level had no real records but a later level did.
    EmptyLevel,
    /// No candidate existed at all; the fabricated node is the sole root.
    MissingRoot,
}

/// Distinguishes records declared in the roster from nodes fabricated to
/// keep the tree connected. Consumers filter on this instead of guessing
/// from naming conventions.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum NodeOrigin {
    Declared,
    Synthesized(SynthesisReason),
}

impl NodeOrigin {
    pub fn is_synthesized(&self) -> bool {
        matches!(self, NodeOrigin::Synthesized(_))
    }
}

/// A node of the constructed forest.
///
/// Children are exclusively owned by their parent; the validator guarantees
/// the structure is acyclic before it is handed out.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LeadershipNode {
    /// Case-folded, trimmed name. This is the dedup identity of the record.
    pub id: String,
    pub display_name: String,
    pub level: Level,
    pub municipality: String,
    pub neighborhood: String,
    /// Declared votes, except on roots that declared zero, where the
    /// aggregator writes back the subtree total.
    pub projected_votes: u64,
    /// Sum of the declared votes of this node and all of its descendants.
    pub subtree_votes: u64,
    pub origin: NodeOrigin,
    pub children: Vec<LeadershipNode>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NeighborhoodStats {
    pub name: String,
    pub votes: u64,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MunicipalityStats {
    pub name: String,
    pub votes: u64,
    /// Neighborhoods of this municipality, sorted by descending votes.
    pub neighborhoods: Vec<NeighborhoodStats>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LevelStats {
    pub level: Level,
    pub records: u64,
    pub votes: u64,
}

/// Flattened figures for the whole forest.
#[derive(PartialEq, Debug, Clone)]
pub struct HierarchySummary {
    pub total_records: u64,
    pub total_votes: u64,
    pub average_votes: f64,
    /// Municipalities sorted by descending votes.
    pub municipalities: Vec<MunicipalityStats>,
    /// One entry per canonical level, in canonical order.
    pub levels: Vec<LevelStats>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct HierarchyResult {
    pub roots: Vec<LeadershipNode>,
    pub summary: HierarchySummary,
    pub skipped_rows: u64,
    pub merged_rows: u64,
    pub synthesized_nodes: u64,
}

/// Errors that prevent the pipeline from handing out a forest.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum HierarchyErrors {
    /// A node is reachable from itself, or reachable through two parents.
    CycleDetected,
    /// The forest is deeper than the configured bound.
    DepthExceeded,
}

impl Error for HierarchyErrors {}

impl Display for HierarchyErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HierarchyErrors::CycleDetected => write!(f, "cycle detected in the constructed forest"),
            HierarchyErrors::DepthExceeded => write!(f, "forest depth exceeds the configured bound"),
        }
    }
}

// ********* Configuration **********

/// Policy for roster rows whose normalized names collide.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DuplicateNameMode {
    /// Collapse colliding rows into a single record, summing their votes.
    /// This replicates the source-of-record dashboard, where the normalized
    /// name is the identity. Merges are logged and counted so the operator
    /// can spot homonyms being swallowed.
    MergeNormalized,
    /// Keep colliding rows as distinct records; later rows get a numeric
    /// suffix on their id.
    KeepDistinct,
}

/// The policies that govern one tabulation.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct HierarchyRules {
    pub duplicate_name_mode: DuplicateNameMode,
    /// Maximum depth accepted by the structural validator.
    pub max_depth: u32,
}

impl HierarchyRules {
    pub const DEFAULT_RULES: HierarchyRules = HierarchyRules {
        duplicate_name_mode: DuplicateNameMode::MergeNormalized,
        max_depth: 20,
    };
}
