/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Graph transformations: edge additions that preserve the set of optimal
//! schedules while shrinking the enumeration space.  None of them removes
//! edges or changes the instruction count.

use crate::data_structures::{InstCount, InstIx, RegIx};
use crate::dep_graph::DataDepGraph;
use crate::interface::SchedError;
use crate::machine_model::DepKind;
use log::debug;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum GraphTransType {
  /// Linearize groups of mutually equivalent instructions.
  EquivDect,
  /// Add an edge from a node to any node it is superior to, considering
  /// register pressure only.
  RpOnlyNodeSup,
}

impl GraphTransType {
  pub fn from_name(name: &str) -> Result<GraphTransType, SchedError> {
    match name {
      "equiv-detect" => Ok(GraphTransType::EquivDect),
      "rp-only-node-sup" => Ok(GraphTransType::RpOnlyNodeSup),
      _ => Err(SchedError::InvalidConfig(format!(
        "unknown graph transformation '{}'",
        name
      ))),
    }
  }
}

/// Apply one transformation.  Returns the number of edges added.
pub fn apply_graph_trans(
  trans: GraphTransType, ddg: &mut DataDepGraph,
) -> Result<InstCount, SchedError> {
  let added = match trans {
    GraphTransType::EquivDect => apply_equiv_dect(ddg),
    GraphTransType::RpOnlyNodeSup => apply_rp_only_node_sup(ddg),
  };
  if added > 0 {
    ddg.updt_graph_info()?;
  }
  Ok(added)
}

//=============================================================================
// Equivalence detection

/// Two instructions are equivalent iff they have the same issue type, the
/// same predecessors and the same successors, where edges are compared by
/// (other endpoint, latency, kind).
fn nodes_are_equiv(ddg: &DataDepGraph, a: InstIx, b: InstIx) -> bool {
  let ia = ddg.inst(a);
  let ib = ddg.inst(b);
  if ia.issu_type != ib.issu_type {
    return false;
  }
  edge_lists_equiv(ddg, a, b, /*scsrs=*/ true)
    && edge_lists_equiv(ddg, a, b, /*scsrs=*/ false)
}

fn edge_lists_equiv(
  ddg: &DataDepGraph, a: InstIx, b: InstIx, scsrs: bool,
) -> bool {
  let key = |ix: InstIx| {
    let inst = ddg.inst(ix);
    let edges = if scsrs { &inst.scsrs } else { &inst.prdcsrs };
    let mut v: Vec<(InstIx, InstCount, DepKind)> =
      edges.iter().map(|e| (e.other, e.ltncy, e.kind)).collect();
    v.sort_unstable();
    v
  };
  key(a) == key(b)
}

fn apply_equiv_dect(ddg: &mut DataDepGraph) -> InstCount {
  let mut nodes: Vec<InstIx> = ddg.real_insts().collect();
  let mut edges_added = 0;

  // Adding an edge between two equivalent instructions invalidates the
  // equal-predecessor condition for the rest of the group, so all members
  // of a group are found first and the linearizing edges added as a batch.
  let mut start = 0;
  while start < nodes.len() {
    let head = nodes[start];
    let mut group = vec![head];
    let mut rest = Vec::new();
    for &n in &nodes[start + 1..] {
      if nodes_are_equiv(ddg, head, n) {
        group.push(n);
      } else {
        rest.push(n);
      }
    }
    if group.len() > 1 {
      debug!("equivalence group of {} around {:?}", group.len(), head);
      for w in group.windows(2) {
        ddg.create_edge(w[0], w[1], 0, DepKind::Other);
        edges_added += 1;
      }
      nodes.truncate(start);
      nodes.extend(rest);
    } else {
      start += 1;
    }
  }
  edges_added
}

//=============================================================================
// Register-pressure-only node superiority

fn apply_rp_only_node_sup(ddg: &mut DataDepGraph) -> InstCount {
  let n = ddg.inst_cnt() as u32;
  let mut edges_added = 0;
  for i in 0..n {
    for j in i + 1..n {
      let a = crate::data_structures::mkInstIx(i);
      let b = crate::data_structures::mkInstIx(j);
      if node_is_superior(ddg, a, b) {
        debug!("node {:?} is superior to {:?}", a, b);
        ddg.create_edge(a, b, 0, DepKind::Other);
        edges_added += 1;
      } else if node_is_superior(ddg, b, a) {
        debug!("node {:?} is superior to {:?}", b, a);
        ddg.create_edge(b, a, 0, DepKind::Other);
        edges_added += 1;
      }
    }
  }
  edges_added
}

/// A is superior to B iff scheduling A before B can never hurt: they share
/// an issue type, are mutually independent, A's recursive predecessors are
/// contained in B's, B's recursive successors are contained in A's, every
/// register B reads that A does not is kept alive by some third instruction
/// below B anyway, and A defines no more registers of any type than B does.
fn node_is_superior(ddg: &DataDepGraph, a: InstIx, b: InstIx) -> bool {
  let ia = ddg.inst(a);
  let ib = ddg.inst(b);

  if ia.issu_type != ib.issu_type {
    return false;
  }
  if !ddg.are_indep(a, b) {
    return false;
  }
  if !ia.rcrsv_prdcsrs.is_subset_of(&ib.rcrsv_prdcsrs) {
    return false;
  }
  if !ib.rcrsv_scsrs.is_subset_of(&ia.rcrsv_scsrs) {
    return false;
  }

  // Registers used by B but not by A must each have another user among B's
  // recursive successors, otherwise moving A up could lengthen B's input
  // live ranges.
  let mut uses_only_b: Vec<RegIx> =
    ib.uses.iter().filter(|r| !ia.uses.contains(*r)).copied().collect();
  if !uses_only_b.is_empty() {
    for cn in 0..ddg.tot_inst_cnt() as u32 {
      if uses_only_b.is_empty() {
        break;
      }
      let c = crate::data_structures::mkInstIx(cn);
      if !ib.rcrsv_scsrs.get(c) {
        continue;
      }
      let ic = ddg.inst(c);
      uses_only_b.retain(|r| !ic.uses.contains(r));
    }
    if !uses_only_b.is_empty() {
      debug!("{:?} has a live range with no later user below {:?}", b, a);
      return false;
    }
  }

  // Per register type, A must not define more registers than B.
  let reg_type_cnt = ddg
    .regs_iter()
    .map(|r| ddg.reg(r).reg_type as usize + 1)
    .max()
    .unwrap_or(0);
  let mut defs_a = vec![0 as InstCount; reg_type_cnt];
  let mut defs_b = vec![0 as InstCount; reg_type_cnt];
  for r in ia.defs.iter() {
    defs_a[ddg.reg(*r).reg_type as usize] += 1;
  }
  for r in ib.defs.iter() {
    defs_b[ddg.reg(*r).reg_type as usize] += 1;
  }
  for t in 0..reg_type_cnt {
    if defs_a[t] > defs_b[t] {
      debug!("{:?} defines more type-{} registers than {:?}", a, t, b);
      return false;
    }
  }

  true
}

//=============================================================================
// Live-in / live-out pinning

/// Force every instruction reading a live-in register ahead of all
/// instructions it is independent of.  Returns the number of edges added.
pub fn fix_live_in(ddg: &mut DataDepGraph) -> Result<InstCount, SchedError> {
  let pinned: Vec<InstIx> = ddg
    .real_insts()
    .filter(|ix| {
      ddg.inst(*ix).uses.iter().any(|r| ddg.reg(*r).is_live_in)
    })
    .collect();
  let mut edges_added = 0;
  for p in pinned.iter() {
    let others: Vec<InstIx> =
      ddg.real_insts().filter(|o| ddg.are_indep(*p, *o)).collect();
    if others.is_empty() {
      continue;
    }
    for o in others {
      ddg.create_edge(*p, o, 0, DepKind::Other);
      edges_added += 1;
    }
    // Refresh reachability so later pinned instructions cannot get a
    // contradictory edge.
    ddg.updt_graph_info()?;
  }
  Ok(edges_added)
}

/// Force every instruction defining a live-out register after all
/// instructions it is independent of.
pub fn fix_live_out(ddg: &mut DataDepGraph) -> Result<InstCount, SchedError> {
  let pinned: Vec<InstIx> = ddg
    .real_insts()
    .filter(|ix| {
      ddg.inst(*ix).defs.iter().any(|r| ddg.reg(*r).is_live_out)
    })
    .collect();
  let mut edges_added = 0;
  for p in pinned.iter() {
    let others: Vec<InstIx> =
      ddg.real_insts().filter(|o| ddg.are_indep(*p, *o)).collect();
    if others.is_empty() {
      continue;
    }
    for o in others {
      ddg.create_edge(o, *p, 0, DepKind::Other);
      edges_added += 1;
    }
    ddg.updt_graph_info()?;
  }
  Ok(edges_added)
}

//=============================================================================

#[cfg(test)]
mod test {
  use super::*;
  use crate::dep_graph::{DdgBuilder, LatencyPrecision};
  use crate::machine_model::{IssueTypeInfo, MachineModel, RegTypeInfo};

  fn model() -> MachineModel {
    MachineModel::new(
      "test",
      1,
      vec![IssueTypeInfo { name: "all".to_string(), slots_per_cycle: 1 }],
      vec![RegTypeInfo { name: "GPR".to_string(), phys_reg_cnt: 2 }],
      vec![],
    )
    .unwrap()
  }

  /// Diamond with two equivalent middle instructions.
  fn equiv_pair_ddg(mm: &MachineModel) -> DataDepGraph {
    let mut b = DdgBuilder::new(mm, LatencyPrecision::Rough, false, 0);
    let top = b.add_inst("top", "Default");
    let m1 = b.add_inst("m1", "Default");
    let m2 = b.add_inst("m2", "Default");
    let bot = b.add_inst("bot", "Default");
    b.add_edge(top, m1, 1, DepKind::Data);
    b.add_edge(top, m2, 1, DepKind::Data);
    b.add_edge(m1, bot, 1, DepKind::Data);
    b.add_edge(m2, bot, 1, DepKind::Data);
    b.finish().unwrap()
  }

  #[test]
  fn test_equiv_dect_adds_one_edge() {
    let mm = model();
    let mut ddg = equiv_pair_ddg(&mm);
    let added =
      apply_graph_trans(GraphTransType::EquivDect, &mut ddg).unwrap();
    assert_eq!(added, 1);
    // The pair is now ordered.
    let m1 = crate::data_structures::mkInstIx(1);
    let m2 = crate::data_structures::mkInstIx(2);
    assert!(ddg.is_rcrsv_scsr(m1, m2));
  }

  #[test]
  fn test_equiv_dect_idempotent() {
    let mm = model();
    let mut ddg = equiv_pair_ddg(&mm);
    let first =
      apply_graph_trans(GraphTransType::EquivDect, &mut ddg).unwrap();
    assert_eq!(first, 1);
    let second =
      apply_graph_trans(GraphTransType::EquivDect, &mut ddg).unwrap();
    assert_eq!(second, 0);
  }

  #[test]
  fn test_node_sup_simple() {
    // i0 and i1 are independent with identical reachability.  i1 reads a
    // live-through register (the exit keeps it alive regardless) and
    // defines two registers; i0 defines one and reads nothing.  i0 is
    // superior: scheduling it first cannot extend any live range.  The
    // converse fails on the def-count condition.
    let mm = model();
    let gpr = mm.reg_type_by_name("GPR").unwrap();
    let mut b = DdgBuilder::new(&mm, LatencyPrecision::Rough, false, 0);
    let i0 = b.add_inst("a", "Default");
    let i1 = b.add_inst("b", "Default");
    let r = b.add_reg(gpr, 1);
    b.set_live_in(r);
    b.set_live_out(r);
    b.add_use(i1, r);
    let r0 = b.add_reg(gpr, 1);
    let r1 = b.add_reg(gpr, 1);
    let r2 = b.add_reg(gpr, 1);
    b.add_def(i0, r0);
    b.add_def(i1, r1);
    b.add_def(i1, r2);
    let mut ddg = b.finish().unwrap();

    assert!(node_is_superior(&ddg, i0, i1));
    assert!(!node_is_superior(&ddg, i1, i0));
    let added =
      apply_graph_trans(GraphTransType::RpOnlyNodeSup, &mut ddg).unwrap();
    assert_eq!(added, 1);
    assert!(ddg.is_rcrsv_scsr(i0, i1));
    // Fixed point after one pass.
    let again =
      apply_graph_trans(GraphTransType::RpOnlyNodeSup, &mut ddg).unwrap();
    assert_eq!(again, 0);
  }

  #[test]
  fn test_node_sup_respects_live_range_condition() {
    // Each instruction reads a live-in register that nothing downstream
    // reads; hoisting either one could extend the other's input live
    // range, so neither is superior.
    let mm = model();
    let gpr = mm.reg_type_by_name("GPR").unwrap();
    let mut b = DdgBuilder::new(&mm, LatencyPrecision::Rough, false, 0);
    let i0 = b.add_inst("a", "Default");
    let i1 = b.add_inst("b", "Default");
    let ra = b.add_reg(gpr, 1);
    let rb = b.add_reg(gpr, 1);
    b.set_live_in(ra);
    b.set_live_in(rb);
    b.add_use(i0, ra);
    b.add_use(i1, rb);
    let ddg = b.finish().unwrap();

    assert!(!node_is_superior(&ddg, i0, i1));
    assert!(!node_is_superior(&ddg, i1, i0));
  }

  #[test]
  fn test_unknown_trans_name_rejected() {
    assert!(GraphTransType::from_name("equiv-detect").is_ok());
    match GraphTransType::from_name("magic") {
      Err(SchedError::InvalidConfig(_)) => {}
      _ => panic!("unknown transformation must be rejected"),
    }
  }
}
