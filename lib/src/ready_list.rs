/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Priority ordering of ready instructions.  A priority scheme is a small
//! ordered list of key extractors; instructions compare by their key tuples
//! left to right, and the heuristic scheduler and the enumerator both rank
//! candidates with it.

use crate::data_structures::{InstCount, InstIx, TypedIxVec};
use crate::dep_graph::DataDepGraph;
use crate::interface::SchedError;
use smallvec::SmallVec;
use std::cmp::Ordering;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PriorityKey {
  /// Latency-weighted distance to the region exit.
  CrtclPath,
  /// Number of direct successors.
  ScsrCnt,
  /// Sum of outgoing edge latencies.
  LtncySum,
  /// Instruction number, lower first (a deterministic tie-breaker).
  NodeNum,
  /// The source compiler's original ordering, earlier first.
  InputOrder,
  /// Number of registers read.
  UseCnt,
  /// Number of registers written, fewer first.
  DefCnt,
}

impl PriorityKey {
  pub fn from_name(name: &str) -> Result<PriorityKey, SchedError> {
    match name {
      "critical-path" => Ok(PriorityKey::CrtclPath),
      "succ-count" => Ok(PriorityKey::ScsrCnt),
      "latency-sum" => Ok(PriorityKey::LtncySum),
      "node-num" => Ok(PriorityKey::NodeNum),
      "input-order" => Ok(PriorityKey::InputOrder),
      "use-count" => Ok(PriorityKey::UseCnt),
      "def-count" => Ok(PriorityKey::DefCnt),
      _ => Err(SchedError::InvalidConfig(format!(
        "unknown priority key '{}'",
        name
      ))),
    }
  }
}

pub type SchedPriorities = Vec<PriorityKey>;

pub fn prirts_from_names(
  names: &[&str],
) -> Result<SchedPriorities, SchedError> {
  names.iter().map(|n| PriorityKey::from_name(n)).collect()
}

//=============================================================================
// Precomputed key tuples

/// Key tuples are static per instruction, so they are computed once up
/// front.  Bigger keys sort first.
pub struct KeyedPrirts {
  keys: TypedIxVec<InstIx, SmallVec<[InstCount; 4]>>,
}

impl KeyedPrirts {
  pub fn new(ddg: &DataDepGraph, prirts: &SchedPriorities) -> KeyedPrirts {
    let mut keys = TypedIxVec::new();
    for ix in ddg.real_insts() {
      let inst = ddg.inst(ix);
      let key: SmallVec<[InstCount; 4]> = prirts
        .iter()
        .map(|p| match p {
          PriorityKey::CrtclPath => inst.bkwrd_lwr_bound,
          PriorityKey::ScsrCnt => inst.scsrs.len() as InstCount,
          PriorityKey::LtncySum => {
            inst.scsrs.iter().map(|e| e.ltncy).sum::<InstCount>()
          }
          PriorityKey::NodeNum => -(ix.get() as InstCount),
          PriorityKey::InputOrder => -inst.input_order,
          PriorityKey::UseCnt => inst.uses.len() as InstCount,
          PriorityKey::DefCnt => -(inst.defs.len() as InstCount),
        })
        .collect();
      keys.push(key);
    }
    KeyedPrirts { keys }
  }

  /// Greater = higher priority.  Falls back to the instruction number so
  /// the total order is always strict.
  pub fn cmpr(&self, a: InstIx, b: InstIx) -> Ordering {
    match self.keys[a].cmp(&self.keys[b]) {
      Ordering::Equal => b.get().cmp(&a.get()),
      ord => ord,
    }
  }

  /// Sort highest-priority first.
  pub fn sort_desc(&self, insts: &mut Vec<InstIx>) {
    insts.sort_by(|a, b| self.cmpr(*b, *a));
  }
}

//=============================================================================
// A ready list kept in priority order

pub struct ReadyList {
  insts: Vec<InstIx>,
}

impl ReadyList {
  pub fn new() -> ReadyList {
    ReadyList { insts: Vec::new() }
  }

  pub fn is_empty(&self) -> bool {
    self.insts.is_empty()
  }

  pub fn len(&self) -> usize {
    self.insts.len()
  }

  pub fn add(&mut self, keyed: &KeyedPrirts, inst: InstIx) {
    let pos = self
      .insts
      .binary_search_by(|probe| keyed.cmpr(inst, *probe))
      .unwrap_or_else(|p| p);
    self.insts.insert(pos, inst);
  }

  pub fn remove(&mut self, inst: InstIx) {
    if let Some(pos) = self.insts.iter().position(|i| *i == inst) {
      self.insts.remove(pos);
    }
  }

  pub fn iter(&self) -> std::slice::Iter<InstIx> {
    self.insts.iter()
  }
}

//=============================================================================

#[cfg(test)]
mod test {
  use super::*;
  use crate::dep_graph::{DdgBuilder, LatencyPrecision};
  use crate::machine_model::{
    DepKind, IssueTypeInfo, MachineModel, RegTypeInfo,
  };

  fn model() -> MachineModel {
    MachineModel::new(
      "test",
      1,
      vec![IssueTypeInfo { name: "all".to_string(), slots_per_cycle: 1 }],
      vec![RegTypeInfo { name: "GPR".to_string(), phys_reg_cnt: 4 }],
      vec![],
    )
    .unwrap()
  }

  #[test]
  fn test_critical_path_ordering() {
    let mm = model();
    let mut b = DdgBuilder::new(&mm, LatencyPrecision::Rough, false, 0);
    let i0 = b.add_inst("short", "Default");
    let i1 = b.add_inst("long", "Default");
    let i2 = b.add_inst("tail", "Default");
    b.add_edge(i1, i2, 5, DepKind::Data);
    let ddg = b.finish().unwrap();

    let keyed = KeyedPrirts::new(&ddg, &vec![PriorityKey::CrtclPath]);
    assert_eq!(keyed.cmpr(i1, i0), Ordering::Greater);

    let mut rdy = ReadyList::new();
    rdy.add(&keyed, i0);
    rdy.add(&keyed, i1);
    assert_eq!(*rdy.iter().next().unwrap(), i1);
    rdy.remove(i1);
    assert_eq!(*rdy.iter().next().unwrap(), i0);
  }

  #[test]
  fn test_tie_break_left_to_right() {
    let mm = model();
    let mut b = DdgBuilder::new(&mm, LatencyPrecision::Rough, false, 0);
    let i0 = b.add_inst("a", "Default");
    let i1 = b.add_inst("b", "Default");
    let i2 = b.add_inst("c", "Default");
    b.add_edge(i0, i2, 1, DepKind::Data);
    b.add_edge(i1, i2, 1, DepKind::Data);
    let ddg = b.finish().unwrap();

    // Same critical path for i0 and i1; node number breaks the tie in
    // favour of the lower index.
    let keyed = KeyedPrirts::new(
      &ddg,
      &vec![PriorityKey::CrtclPath, PriorityKey::NodeNum],
    );
    assert_eq!(keyed.cmpr(i0, i1), Ordering::Greater);

    let mut v = vec![i2, i1, i0];
    keyed.sort_desc(&mut v);
    assert_eq!(v, vec![i0, i1, i2]);
  }

  #[test]
  fn test_unknown_priority_name_rejected() {
    assert!(PriorityKey::from_name("critical-path").is_ok());
    assert!(prirts_from_names(&["critical-path", "bogus"]).is_err());
  }
}
