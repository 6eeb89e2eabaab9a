mod config;

pub mod builder;
pub mod manual;

use log::{debug, info, warn};

use std::collections::{HashMap, HashSet};

pub use crate::config::*;

// **** Private structures ****

/// Index of a node in the arena. All the linking is index-based; the owned
/// output tree is only materialized at the very end, once the structure has
/// been validated.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct NodeId(u32);

#[derive(Eq, PartialEq, Debug, Clone)]
struct Node {
    id: String,
    display_name: String,
    level: Level,
    municipality: String,
    neighborhood: String,
    declared_votes: u64,
    projected_votes: u64,
    subtree_votes: u64,
    origin: NodeOrigin,
    children: Vec<NodeId>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    fn alloc(&mut self, node: Node) -> NodeId {
        let nid = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        nid
    }

    fn node(&self, nid: NodeId) -> &Node {
        &self.nodes[nid.0 as usize]
    }

    fn node_mut(&mut self, nid: NodeId) -> &mut Node {
        &mut self.nodes[nid.0 as usize]
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Outcome of the classification stage.
struct ClassifiedRoster {
    arena: Arena,
    /// Classified records, in input order.
    records: Vec<NodeId>,
    skipped_rows: u64,
    merged_rows: u64,
}

/// Builds the leadership forest and its statistics from a flat roster.
///
/// Arguments:
/// * `rows` the raw roster rows, in spreadsheet order
/// * `rules` the policies that govern classification and validation
///
/// The same input always yields the same forest: group and parent selection
/// are resolved by input order, never by map iteration order.
pub fn build_hierarchy(
    rows: &[RawRow],
    rules: &HierarchyRules,
) -> Result<HierarchyResult, HierarchyErrors> {
    info!(
        "build_hierarchy: processing {:?} raw rows, rules: {:?}",
        rows.len(),
        rules
    );

    let ClassifiedRoster {
        mut arena,
        records,
        skipped_rows,
        merged_rows,
    } = classify_rows(rows, rules);
    debug!(
        "build_hierarchy: classified {:?} records, skipped {:?}, merged {:?}",
        records.len(),
        skipped_rows,
        merged_rows
    );

    let mut buckets = bucketize(&arena, &records);
    let synthesized = synthesize_placeholders(&mut arena, &mut buckets);
    let synthesized_nodes = synthesized.len() as u64;

    link_levels(&mut arena, &buckets);
    let roots: Vec<NodeId> = buckets[0].clone();
    info!(
        "build_hierarchy: linked {:?} nodes under {:?} roots ({:?} synthesized)",
        arena.len(),
        roots.len(),
        synthesized_nodes
    );

    aggregate_votes(&mut arena, &roots);

    let repaired = audit_completeness(&mut arena, &roots);
    if repaired > 0 {
        // The repair changed subtree compositions. Recompute before the
        // figures are compiled.
        aggregate_votes(&mut arena, &roots);
    }

    let summary = compile_stats(&arena, &roots);

    validate_forest(&arena, &roots, rules.max_depth)?;

    let result_roots = materialize(&arena, &roots);
    info!(
        "build_hierarchy: forest of {:?} roots, {:?} records, {:?} total votes",
        result_roots.len(),
        summary.total_records,
        summary.total_votes
    );
    Ok(HierarchyResult {
        roots: result_roots,
        summary,
        skipped_rows,
        merged_rows,
        synthesized_nodes,
    })
}

// **** Record classifier ****

/// Maps the free-text level tags found in rosters to a canonical level.
///
/// The matching is case-insensitive on the trimmed text. Exact tags come
/// first; any text carrying a level marker has its last digit extracted;
/// everything else defaults to the plain leader level.
pub fn normalize_level(raw: &str) -> Level {
    let folded = raw.trim().to_lowercase();
    match folded.as_str() {
        "candidato" => return Level::Candidate,
        "lideranca" | "liderança" => return Level::Leader,
        _ => {}
    }
    let has_level_marker = folded.contains("nivel")
        || folded.contains("nível")
        || folded.starts_with("lideranca")
        || folded.ends_with(|c: char| c.is_ascii_digit());
    if has_level_marker {
        if let Some(digit) = folded.chars().rev().find_map(|c| c.to_digit(10)) {
            match digit {
                1 => return Level::Level1,
                2 => return Level::Level2,
                3 => return Level::Level3,
                4 => return Level::Level4,
                5 => return Level::Level5,
                _ => {}
            }
        }
    }
    Level::Leader
}

/// Parses the projected-votes field. Spreadsheet exports are messy here:
/// plain integers, Excel floats and free text all occur. Anything that is
/// not a non-negative number counts as zero.
fn parse_votes(raw: Option<&str>) -> u64 {
    let text = match raw {
        Some(t) => t.trim(),
        None => return 0,
    };
    if text.is_empty() {
        return 0;
    }
    if let Ok(v) = text.parse::<u64>() {
        return v;
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() && f > 0.0 => f.trunc() as u64,
        _ => 0,
    }
}

fn locality_or_default(raw: &Option<String>) -> String {
    match raw.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => UNSPECIFIED.to_string(),
    }
}

/// Normalizes every raw row into a record in the arena.
///
/// Rows with no usable name are skipped (counted, never an error). The
/// case-folded trimmed name is the record identity; collisions are resolved
/// according to the duplicate-name policy.
fn classify_rows(rows: &[RawRow], rules: &HierarchyRules) -> ClassifiedRoster {
    let mut arena = Arena::default();
    let mut records: Vec<NodeId> = Vec::new();
    let mut by_id: HashMap<String, NodeId> = HashMap::new();
    let mut skipped_rows = 0u64;
    let mut merged_rows = 0u64;

    for (idx, row) in rows.iter().enumerate() {
        let name = row.name.as_deref().map(str::trim).unwrap_or("");
        if name.is_empty() {
            debug!("classify_rows: row {:?} has no usable name, skipping", idx);
            skipped_rows += 1;
            continue;
        }
        let base_id = name.to_lowercase();
        let level = normalize_level(row.level.as_deref().unwrap_or(""));
        let votes = parse_votes(row.votes.as_deref());

        let id = match by_id.get(&base_id) {
            None => base_id,
            Some(&existing) => match rules.duplicate_name_mode {
                DuplicateNameMode::MergeNormalized => {
                    // Two distinct people sharing a normalized name are
                    // indistinguishable here; the merge is deliberate but
                    // observable through the log and the counter.
                    warn!(
                        "classify_rows: row {:?} ({:?}) collides with an earlier record, merging",
                        idx, name
                    );
                    let node = arena.node_mut(existing);
                    node.declared_votes += votes;
                    node.projected_votes += votes;
                    merged_rows += 1;
                    continue;
                }
                DuplicateNameMode::KeepDistinct => {
                    let mut n = 2;
                    loop {
                        let candidate = format!("{}#{}", base_id, n);
                        if !by_id.contains_key(&candidate) {
                            break candidate;
                        }
                        n += 1;
                    }
                }
            },
        };

        let nid = arena.alloc(Node {
            id: id.clone(),
            display_name: name.to_string(),
            level,
            municipality: locality_or_default(&row.municipality),
            neighborhood: locality_or_default(&row.neighborhood),
            declared_votes: votes,
            projected_votes: votes,
            subtree_votes: 0,
            origin: NodeOrigin::Declared,
            children: Vec::new(),
        });
        by_id.insert(id, nid);
        records.push(nid);
    }

    ClassifiedRoster {
        arena,
        records,
        skipped_rows,
        merged_rows,
    }
}

// **** Level bucketizer ****

fn bucketize(arena: &Arena, records: &[NodeId]) -> Vec<Vec<NodeId>> {
    let mut buckets: Vec<Vec<NodeId>> = vec![Vec::new(); NUM_LEVELS];
    for &nid in records {
        buckets[arena.node(nid).level.rank()].push(nid);
    }
    buckets
}

// **** Placeholder synthesizer ****

fn placeholder_node(level: Level, reason: SynthesisReason) -> Node {
    let display_name = match reason {
        SynthesisReason::MissingRoot => "Campaign coordination".to_string(),
        SynthesisReason::EmptyLevel => format!("Intermediate coordination ({})", level.label()),
    };
    Node {
        id: format!("synthetic-{}", level.label()),
        display_name,
        level,
        municipality: GLOBAL_SCOPE.to_string(),
        neighborhood: GLOBAL_SCOPE.to_string(),
        declared_votes: 0,
        projected_votes: 0,
        subtree_votes: 0,
        origin: NodeOrigin::Synthesized(reason),
        children: Vec::new(),
    }
}

/// Fabricates one stand-in node for every empty level that sits between two
/// populated ones, so the linker always finds a parent candidate.
///
/// The level pairs are walked from the deepest up: a placeholder inserted at
/// level i immediately becomes the non-empty side of the pair (i - 1, i),
/// chaining the fabrication down to the candidate level when needed. A
/// wholly empty roster synthesizes nothing.
fn synthesize_placeholders(arena: &mut Arena, buckets: &mut [Vec<NodeId>]) -> Vec<NodeId> {
    let mut synthesized: Vec<NodeId> = Vec::new();
    for rank in (1..NUM_LEVELS).rev() {
        if buckets[rank].is_empty() || !buckets[rank - 1].is_empty() {
            continue;
        }
        let level = Level::ALL[rank - 1];
        let reason = if rank - 1 == 0 {
            SynthesisReason::MissingRoot
        } else {
            SynthesisReason::EmptyLevel
        };
        let nid = arena.alloc(placeholder_node(level, reason));
        debug!(
            "synthesize_placeholders: level {:?} was empty, inserted {:?}",
            level, nid
        );
        buckets[rank - 1].push(nid);
        synthesized.push(nid);
    }
    synthesized
}

// **** Tree linker ****

/// Connects every record of each level to exactly one parent in the
/// preceding level.
///
/// Records are partitioned by municipality; a locality group whose
/// municipality matches some parent attaches wholesale to the first such
/// parent, the rest falls back to round-robin balancing. This is a greedy,
/// first-match placement, not a globally optimal one.
fn link_levels(arena: &mut Arena, buckets: &[Vec<NodeId>]) {
    for rank in 1..NUM_LEVELS {
        let current = &buckets[rank];
        if current.is_empty() {
            continue;
        }
        // Non-empty by construction after the synthesizer pass.
        let parents = &buckets[rank - 1];
        debug!(
            "link_levels: rank {:?}: {:?} records, {:?} parent candidates",
            rank,
            current.len(),
            parents.len()
        );

        // Partition by municipality, preserving first-seen order so the
        // placement stays deterministic for identical input.
        let mut groups: Vec<(String, Vec<NodeId>)> = Vec::new();
        for &nid in current {
            let muni = arena.node(nid).municipality.clone();
            match groups.iter_mut().find(|(m, _)| *m == muni) {
                Some((_, members)) => members.push(nid),
                None => groups.push((muni, vec![nid])),
            }
        }

        // The round-robin counter is shared across all the locality groups
        // of this level so the fallback load stays balanced.
        let mut next_parent = 0usize;
        for (muni, members) in groups {
            let local_parent = parents
                .iter()
                .copied()
                .find(|&pid| arena.node(pid).municipality == muni);
            match local_parent {
                Some(pid) => {
                    debug!(
                        "link_levels: locality {:?}: attaching {:?} records to {:?}",
                        muni,
                        members.len(),
                        pid
                    );
                    for nid in members {
                        arena.node_mut(pid).children.push(nid);
                    }
                }
                None => {
                    for nid in members {
                        let pid = parents[next_parent % parents.len()];
                        next_parent += 1;
                        debug!(
                            "link_levels: no parent in {:?}, round-robin {:?} -> {:?}",
                            muni, nid, pid
                        );
                        arena.node_mut(pid).children.push(nid);
                    }
                }
            }
        }
    }
}

// **** Traversals ****

/// Pre-order over the forest on an explicit work stack. Reversing the
/// returned order visits every child before its parent.
///
/// Nodes already seen are skipped so the walk terminates even on a
/// defective structure; the validator reports those separately.
fn traversal_order(arena: &Arena, roots: &[NodeId]) -> Vec<NodeId> {
    let mut order: Vec<NodeId> = Vec::new();
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<NodeId> = roots.iter().rev().copied().collect();
    while let Some(nid) = stack.pop() {
        if !seen.insert(nid) {
            continue;
        }
        order.push(nid);
        for &child in arena.node(nid).children.iter().rev() {
            stack.push(child);
        }
    }
    order
}

// **** Vote aggregator ****

/// Sums each node's subtree votes, children before parents, and back-fills
/// the projection of roots that declared zero.
fn aggregate_votes(arena: &mut Arena, roots: &[NodeId]) {
    let order = traversal_order(arena, roots);
    for &nid in order.iter().rev() {
        let child_sum: u64 = arena
            .node(nid)
            .children
            .iter()
            .map(|&c| arena.node(c).subtree_votes)
            .sum();
        let node = arena.node_mut(nid);
        node.subtree_votes = node.declared_votes + child_sum;
    }
    for &rid in roots {
        let node = arena.node_mut(rid);
        if node.declared_votes == 0 {
            node.projected_votes = node.subtree_votes;
        }
    }
}

// **** Completeness auditor ****

/// Guarantees that every classified or synthesized record is reachable from
/// some root. Unattached records are force-attached to the least-loaded
/// root, re-selecting after every attachment so the repair stays balanced.
///
/// This is expected to be a no-op by construction; a non-zero repair count
/// points at a linking defect, not at bad input.
fn audit_completeness(arena: &mut Arena, roots: &[NodeId]) -> u64 {
    let attached: HashSet<NodeId> = traversal_order(arena, roots).into_iter().collect();
    let orphans: Vec<NodeId> = (0..arena.len() as u32)
        .map(NodeId)
        .filter(|nid| !attached.contains(nid))
        .collect();
    if orphans.is_empty() {
        return 0;
    }
    warn!(
        "audit_completeness: {:?} records were left unattached, repairing",
        orphans.len()
    );
    let mut repaired = 0u64;
    for nid in orphans {
        let target = roots
            .iter()
            .copied()
            .min_by_key(|&rid| arena.node(rid).children.len());
        if let Some(rid) = target {
            warn!("audit_completeness: attaching {:?} to root {:?}", nid, rid);
            arena.node_mut(rid).children.push(nid);
            repaired += 1;
        }
    }
    repaired
}

// **** Statistics compiler ****

fn compile_stats(arena: &Arena, roots: &[NodeId]) -> HierarchySummary {
    let mut municipalities: Vec<MunicipalityStats> = Vec::new();
    let mut level_records = [0u64; NUM_LEVELS];
    let mut level_votes = [0u64; NUM_LEVELS];
    let mut total_records = 0u64;
    let mut total_votes = 0u64;

    for nid in traversal_order(arena, roots) {
        let node = arena.node(nid);
        total_records += 1;
        total_votes += node.projected_votes;
        level_records[node.level.rank()] += 1;
        level_votes[node.level.rank()] += node.projected_votes;

        let mi = match municipalities
            .iter()
            .position(|m| m.name == node.municipality)
        {
            Some(i) => i,
            None => {
                municipalities.push(MunicipalityStats {
                    name: node.municipality.clone(),
                    votes: 0,
                    neighborhoods: Vec::new(),
                });
                municipalities.len() - 1
            }
        };
        let muni = &mut municipalities[mi];
        muni.votes += node.projected_votes;
        match muni
            .neighborhoods
            .iter_mut()
            .find(|n| n.name == node.neighborhood)
        {
            Some(n) => n.votes += node.projected_votes,
            None => muni.neighborhoods.push(NeighborhoodStats {
                name: node.neighborhood.clone(),
                votes: node.projected_votes,
            }),
        }
    }

    // Descending by votes; the sort is stable, ties keep first appearance.
    for muni in municipalities.iter_mut() {
        muni.neighborhoods.sort_by(|a, b| b.votes.cmp(&a.votes));
    }
    municipalities.sort_by(|a, b| b.votes.cmp(&a.votes));

    let average_votes = if total_records == 0 {
        0.0
    } else {
        total_votes as f64 / total_records as f64
    };
    let levels = Level::ALL
        .iter()
        .map(|&level| LevelStats {
            level,
            records: level_records[level.rank()],
            votes: level_votes[level.rank()],
        })
        .collect();

    HierarchySummary {
        total_records,
        total_votes,
        average_votes,
        municipalities,
        levels,
    }
}

// **** Structural validator ****

enum Walk {
    Enter(NodeId, u32),
    Exit(NodeId),
}

/// Confirms the forest is a true forest before it crosses the serialization
/// boundary: no node on its own ancestor path, no node reachable through
/// two parents, depth within the configured bound.
fn validate_forest(
    arena: &Arena,
    roots: &[NodeId],
    max_depth: u32,
) -> Result<(), HierarchyErrors> {
    let mut visiting: HashSet<NodeId> = HashSet::new();
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<Walk> = roots.iter().rev().map(|&r| Walk::Enter(r, 1)).collect();
    while let Some(step) = stack.pop() {
        match step {
            Walk::Enter(nid, depth) => {
                if depth > max_depth {
                    warn!(
                        "validate_forest: depth {:?} exceeds the bound {:?} at {:?}",
                        depth, max_depth, nid
                    );
                    return Err(HierarchyErrors::DepthExceeded);
                }
                if visiting.contains(&nid) {
                    warn!("validate_forest: {:?} is its own ancestor", nid);
                    return Err(HierarchyErrors::CycleDetected);
                }
                if !visited.insert(nid) {
                    warn!("validate_forest: {:?} is reachable through two parents", nid);
                    return Err(HierarchyErrors::CycleDetected);
                }
                visiting.insert(nid);
                stack.push(Walk::Exit(nid));
                for &child in arena.node(nid).children.iter().rev() {
                    stack.push(Walk::Enter(child, depth + 1));
                }
            }
            Walk::Exit(nid) => {
                visiting.remove(&nid);
            }
        }
    }
    Ok(())
}

// **** Materialization ****

/// Turns the arena into the owned, exclusively-parented output forest.
/// Children are built before their parent (reverse pre-order), so the take
/// below always finds the finished child.
fn materialize(arena: &Arena, roots: &[NodeId]) -> Vec<LeadershipNode> {
    let order = traversal_order(arena, roots);
    let mut built: Vec<Option<LeadershipNode>> = Vec::new();
    built.resize_with(arena.len(), || None);
    for &nid in order.iter().rev() {
        let node = arena.node(nid);
        let children: Vec<LeadershipNode> = node
            .children
            .iter()
            .filter_map(|&c| built[c.0 as usize].take())
            .collect();
        built[nid.0 as usize] = Some(LeadershipNode {
            id: node.id.clone(),
            display_name: node.display_name.clone(),
            level: node.level,
            municipality: node.municipality.clone(),
            neighborhood: node.neighborhood.clone(),
            projected_votes: node.projected_votes,
            subtree_votes: node.subtree_votes,
            origin: node.origin,
            children,
        });
    }
    roots
        .iter()
        .filter_map(|&r| built[r.0 as usize].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, level: &str, municipality: &str, votes: &str) -> RawRow {
        RawRow {
            name: Some(name.to_string()),
            level: Some(level.to_string()),
            municipality: Some(municipality.to_string()),
            neighborhood: None,
            votes: Some(votes.to_string()),
        }
    }

    fn build(rows: &[RawRow]) -> HierarchyResult {
        build_hierarchy(rows, &HierarchyRules::DEFAULT_RULES).unwrap()
    }

    fn collect<'a>(nodes: &'a [LeadershipNode], out: &mut Vec<&'a LeadershipNode>) {
        for node in nodes {
            out.push(node);
            collect(&node.children, out);
        }
    }

    fn flatten(result: &HierarchyResult) -> Vec<&LeadershipNode> {
        let mut out = Vec::new();
        collect(&result.roots, &mut out);
        out
    }

    fn test_node(id: &str, level: Level) -> Node {
        Node {
            id: id.to_string(),
            display_name: id.to_string(),
            level,
            municipality: UNSPECIFIED.to_string(),
            neighborhood: UNSPECIFIED.to_string(),
            declared_votes: 0,
            projected_votes: 0,
            subtree_votes: 0,
            origin: NodeOrigin::Declared,
            children: Vec::new(),
        }
    }

    #[test]
    fn candidate_with_leader() {
        let result = build(&[
            row("Ana", "candidato", "Teresina", "0"),
            row("Bruno", "lideranca", "Teresina", "100"),
        ]);
        assert_eq!(result.roots.len(), 1);
        let ana = &result.roots[0];
        assert_eq!(ana.id, "ana");
        assert_eq!(ana.level, Level::Candidate);
        assert_eq!(ana.projected_votes, 100);
        assert_eq!(ana.subtree_votes, 100);
        assert_eq!(ana.children.len(), 1);
        assert_eq!(ana.children[0].id, "bruno");
        assert_eq!(result.synthesized_nodes, 0);
    }

    #[test]
    fn placeholder_chain() {
        let result = build(&[
            row("Ana", "candidato", "Teresina", "0"),
            row("Zeca", "lideranca nivel 2", "Teresina", "40"),
        ]);
        // The leader and level1 ranks are both fabricated.
        assert_eq!(result.synthesized_nodes, 2);
        assert_eq!(result.roots.len(), 1);
        let leader = &result.roots[0].children[0];
        assert_eq!(leader.level, Level::Leader);
        assert_eq!(
            leader.origin,
            NodeOrigin::Synthesized(SynthesisReason::EmptyLevel)
        );
        assert_eq!(leader.municipality, GLOBAL_SCOPE);
        let level1 = &leader.children[0];
        assert_eq!(level1.level, Level::Level1);
        assert!(level1.origin.is_synthesized());
        let zeca = &level1.children[0];
        assert_eq!(zeca.id, "zeca");
        assert_eq!(zeca.level, Level::Level2);
        assert_eq!(zeca.origin, NodeOrigin::Declared);
        // Placeholders contribute nothing, the root still sees the votes.
        assert_eq!(result.roots[0].projected_votes, 40);
    }

    #[test]
    fn missing_candidate_synthesizes_root() {
        let result = build(&[
            row("Bruno", "lideranca", "Teresina", "70"),
            row("Carla", "lideranca", "Picos", "30"),
        ]);
        assert_eq!(result.roots.len(), 1);
        let root = &result.roots[0];
        assert_eq!(
            root.origin,
            NodeOrigin::Synthesized(SynthesisReason::MissingRoot)
        );
        assert_eq!(root.level, Level::Candidate);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.projected_votes, 100);
    }

    #[test]
    fn duplicate_names_merge() {
        let result = build(&[
            row("ana", "candidato", "Teresina", "10"),
            row("Ana ", "candidato", "Teresina", "15"),
        ]);
        assert_eq!(result.merged_rows, 1);
        assert_eq!(result.roots.len(), 1);
        assert_eq!(result.roots[0].id, "ana");
        assert_eq!(result.roots[0].projected_votes, 25);
    }

    #[test]
    fn duplicate_names_kept_distinct() {
        let rules = HierarchyRules {
            duplicate_name_mode: DuplicateNameMode::KeepDistinct,
            ..HierarchyRules::DEFAULT_RULES
        };
        let result = build_hierarchy(
            &[
                row("ana", "candidato", "Teresina", "10"),
                row("Ana ", "candidato", "Teresina", "15"),
                row("ANA", "candidato", "Teresina", "5"),
            ],
            &rules,
        )
        .unwrap();
        assert_eq!(result.merged_rows, 0);
        let mut ids: Vec<&str> = result.roots.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["ana", "ana#2", "ana#3"]);
    }

    #[test]
    fn locality_match_attaches_to_one_parent() {
        let result = build(&[
            row("Ana", "candidato", "Picos", "0"),
            row("Beto", "candidato", "Teresina", "0"),
            row("Carla", "lideranca", "Picos", "10"),
            row("Dani", "lideranca", "Picos", "20"),
            row("Edu", "lideranca", "Picos", "30"),
        ]);
        let ana = result.roots.iter().find(|r| r.id == "ana").unwrap();
        let beto = result.roots.iter().find(|r| r.id == "beto").unwrap();
        assert_eq!(ana.children.len(), 3);
        assert!(beto.children.is_empty());
        assert_eq!(ana.projected_votes, 60);
    }

    #[test]
    fn round_robin_without_locality_match() {
        let result = build(&[
            row("Ana", "candidato", "Picos", "0"),
            row("Beto", "candidato", "Teresina", "0"),
            row("L1", "lideranca", "Oeiras", "1"),
            row("L2", "lideranca", "Floriano", "1"),
            row("L3", "lideranca", "Altos", "1"),
            row("L4", "lideranca", "Piripiri", "1"),
        ]);
        let ana = result.roots.iter().find(|r| r.id == "ana").unwrap();
        let beto = result.roots.iter().find(|r| r.id == "beto").unwrap();
        assert_eq!(ana.children.len(), 2);
        assert_eq!(beto.children.len(), 2);
    }

    #[test]
    fn unparseable_votes_count_as_zero() {
        let result = build(&[
            row("Ana", "candidato", "Teresina", "abc"),
            row("Bruno", "lideranca", "Teresina", "12"),
        ]);
        // Ana declared nothing usable, so the subtree sum is backfilled.
        assert_eq!(result.roots[0].projected_votes, 12);
    }

    #[test]
    fn parse_votes_recovery() {
        assert_eq!(parse_votes(Some("120")), 120);
        assert_eq!(parse_votes(Some(" 120 ")), 120);
        assert_eq!(parse_votes(Some("1200.0")), 1200);
        assert_eq!(parse_votes(Some("35.7")), 35);
        assert_eq!(parse_votes(Some("-5")), 0);
        assert_eq!(parse_votes(Some("abc")), 0);
        assert_eq!(parse_votes(Some("")), 0);
        assert_eq!(parse_votes(None), 0);
    }

    #[test]
    fn empty_roster() {
        let result = build(&[]);
        assert!(result.roots.is_empty());
        assert_eq!(result.summary.total_records, 0);
        assert_eq!(result.summary.total_votes, 0);
        assert_eq!(result.summary.average_votes, 0.0);
        assert_eq!(result.synthesized_nodes, 0);
        assert!(result.summary.municipalities.is_empty());
    }

    #[test]
    fn rows_without_names_are_skipped() {
        let mut nameless = RawRow::default();
        nameless.votes = Some("50".to_string());
        let blank = RawRow {
            name: Some("   ".to_string()),
            ..RawRow::default()
        };
        let result = build_hierarchy(
            &[
                nameless,
                blank,
                row("Ana", "candidato", "Teresina", "10"),
            ],
            &HierarchyRules::DEFAULT_RULES,
        )
        .unwrap();
        assert_eq!(result.skipped_rows, 2);
        assert_eq!(result.summary.total_records, 1);
    }

    #[test]
    fn level_normalization() {
        assert_eq!(normalize_level("candidato"), Level::Candidate);
        assert_eq!(normalize_level("CANDIDATO"), Level::Candidate);
        assert_eq!(normalize_level("lideranca"), Level::Leader);
        assert_eq!(normalize_level("Liderança"), Level::Leader);
        assert_eq!(normalize_level("lideranca n1"), Level::Level1);
        assert_eq!(normalize_level("liderancanivel2"), Level::Level2);
        assert_eq!(normalize_level("Lideranca Nivel 3"), Level::Level3);
        assert_eq!(normalize_level("nível 4"), Level::Level4);
        assert_eq!(normalize_level("coordenador 5"), Level::Level5);
        // Out-of-range digits and free text default to the leader level.
        assert_eq!(normalize_level("lideranca n9"), Level::Leader);
        assert_eq!(normalize_level("nivel 0"), Level::Leader);
        assert_eq!(normalize_level("coordenador"), Level::Leader);
        assert_eq!(normalize_level(""), Level::Leader);
    }

    #[test]
    fn nonzero_root_keeps_declared_votes() {
        let result = build(&[
            row("Ana", "candidato", "Teresina", "50"),
            row("Bruno", "lideranca", "Teresina", "100"),
        ]);
        let ana = &result.roots[0];
        assert_eq!(ana.projected_votes, 50);
        // The subtree figure still carries the full sum.
        assert_eq!(ana.subtree_votes, 150);
    }

    #[test]
    fn vote_conservation_on_zero_roots() {
        let rows = vec![
            row("Ana", "candidato", "Teresina", "0"),
            row("B1", "lideranca", "Teresina", "10"),
            row("B2", "lideranca", "Picos", "20"),
            row("C1", "nivel 1", "Teresina", "30"),
            row("C2", "nivel 2", "Picos", "40"),
        ];
        let result = build(&rows);
        let declared_total: u64 = [10, 20, 30, 40].iter().sum();
        assert_eq!(result.roots.len(), 1);
        assert_eq!(result.roots[0].projected_votes, declared_total);
        assert_eq!(result.roots[0].subtree_votes, declared_total);
    }

    #[test]
    fn level_ordering_property() {
        let result = build(&[
            row("Ana", "candidato", "Teresina", "0"),
            row("B1", "lideranca", "Teresina", "10"),
            row("C1", "nivel 1", "Oeiras", "30"),
            row("D1", "nivel 3", "Picos", "40"),
            row("E1", "nivel 5", "Altos", "5"),
        ]);
        for node in flatten(&result) {
            for child in node.children.iter() {
                assert!(
                    child.level > node.level,
                    "child {:?} not below parent {:?}",
                    child.id,
                    node.id
                );
            }
        }
    }

    #[test]
    fn coverage_property() {
        let rows = vec![
            row("Ana", "candidato", "Teresina", "0"),
            row("B1", "lideranca", "Teresina", "10"),
            row("C1", "nivel 2", "Picos", "30"),
            row("ana", "candidato", "Teresina", "7"),
        ];
        let result = build(&rows);
        let classified = rows.len() as u64 - result.skipped_rows - result.merged_rows;
        let all = flatten(&result);
        assert_eq!(all.len() as u64, classified + result.synthesized_nodes);
        let mut ids: Vec<&str> = all.iter().map(|n| n.id.as_str()).collect();
        ids.sort();
        let before = ids.len();
        ids.dedup();
        assert_eq!(before, ids.len(), "duplicated id in the forest");
    }

    #[test]
    fn idempotence() {
        let rows = vec![
            row("Ana", "candidato", "Teresina", "0"),
            row("B1", "lideranca", "Oeiras", "10"),
            row("B2", "lideranca", "Floriano", "20"),
            row("C1", "nivel 1", "Teresina", "30"),
        ];
        let first = build(&rows);
        let second = build(&rows);
        assert_eq!(first, second);
    }

    #[test]
    fn statistics_consistency() {
        let result = build(&[
            row("Ana", "candidato", "Teresina", "0"),
            row("B1", "lideranca", "Teresina", "10"),
            row("B2", "lideranca", "Picos", "20"),
            row("C1", "nivel 1", "Picos", "30"),
        ]);
        let summary = &result.summary;
        let muni_total: u64 = summary.municipalities.iter().map(|m| m.votes).sum();
        assert_eq!(muni_total, summary.total_votes);
        for muni in summary.municipalities.iter() {
            let neigh_total: u64 = muni.neighborhoods.iter().map(|n| n.votes).sum();
            assert_eq!(neigh_total, muni.votes);
        }
        let level_count: u64 = summary.levels.iter().map(|l| l.records).sum();
        assert_eq!(level_count, summary.total_records);
        let level_votes: u64 = summary.levels.iter().map(|l| l.votes).sum();
        assert_eq!(level_votes, summary.total_votes);
    }

    #[test]
    fn statistics_sorted_by_votes() {
        let result = build(&[
            row("Ana", "candidato", "Teresina", "5"),
            row("B1", "lideranca", "Picos", "100"),
            row("B2", "lideranca", "Oeiras", "50"),
        ]);
        let names: Vec<&str> = result
            .summary
            .municipalities
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["Picos", "Oeiras", "Teresina"]);
    }

    #[test]
    fn missing_locality_gets_the_sentinel() {
        let result = build_hierarchy(
            &[RawRow {
                name: Some("Ana".to_string()),
                level: Some("candidato".to_string()),
                ..RawRow::default()
            }],
            &HierarchyRules::DEFAULT_RULES,
        )
        .unwrap();
        assert_eq!(result.roots[0].municipality, UNSPECIFIED);
        assert_eq!(result.roots[0].neighborhood, UNSPECIFIED);
    }

    #[test]
    fn audit_attaches_orphans_to_least_loaded_root() {
        let mut arena = Arena::default();
        let r1 = arena.alloc(test_node("r1", Level::Candidate));
        let r2 = arena.alloc(test_node("r2", Level::Candidate));
        let c1 = arena.alloc(test_node("c1", Level::Leader));
        arena.node_mut(r1).children.push(c1);
        let orphan = arena.alloc(test_node("lost", Level::Leader));
        let repaired = audit_completeness(&mut arena, &[r1, r2]);
        assert_eq!(repaired, 1);
        assert_eq!(arena.node(r2).children, vec![orphan]);
    }

    #[test]
    fn audit_is_a_noop_on_a_complete_forest() {
        let mut arena = Arena::default();
        let r1 = arena.alloc(test_node("r1", Level::Candidate));
        let c1 = arena.alloc(test_node("c1", Level::Leader));
        arena.node_mut(r1).children.push(c1);
        assert_eq!(audit_completeness(&mut arena, &[r1]), 0);
    }

    #[test]
    fn validator_rejects_cycles() {
        let mut arena = Arena::default();
        let a = arena.alloc(test_node("a", Level::Candidate));
        let b = arena.alloc(test_node("b", Level::Leader));
        arena.node_mut(a).children.push(b);
        arena.node_mut(b).children.push(a);
        assert_eq!(
            validate_forest(&arena, &[a], 20),
            Err(HierarchyErrors::CycleDetected)
        );
    }

    #[test]
    fn validator_rejects_shared_nodes() {
        let mut arena = Arena::default();
        let a = arena.alloc(test_node("a", Level::Candidate));
        let b = arena.alloc(test_node("b", Level::Candidate));
        let shared = arena.alloc(test_node("shared", Level::Leader));
        arena.node_mut(a).children.push(shared);
        arena.node_mut(b).children.push(shared);
        assert_eq!(
            validate_forest(&arena, &[a, b], 20),
            Err(HierarchyErrors::CycleDetected)
        );
    }

    #[test]
    fn validator_rejects_excessive_depth() {
        let mut arena = Arena::default();
        let mut ids: Vec<NodeId> = Vec::new();
        for i in 0..25 {
            ids.push(arena.alloc(test_node(&format!("n{}", i), Level::Leader)));
        }
        for w in ids.windows(2) {
            arena.node_mut(w[0]).children.push(w[1]);
        }
        assert_eq!(
            validate_forest(&arena, &[ids[0]], 20),
            Err(HierarchyErrors::DepthExceeded)
        );
        assert_eq!(validate_forest(&arena, &[ids[0]], 25), Ok(()));
    }

    #[test]
    fn large_roster_tabulates() {
        let mut rows = vec![row("Ana", "candidato", "Teresina", "0")];
        rows.push(row("B", "lideranca", "Teresina", "1"));
        for i in 0..2000 {
            rows.push(row(&format!("N{}", i), "nivel 1", "Teresina", "1"));
        }
        let result = build(&rows);
        assert_eq!(result.summary.total_records, 2002);
        assert_eq!(result.roots[0].projected_votes, 2001);
    }
}
