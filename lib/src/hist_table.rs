/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! The history table: a compact persistent record of every expanded
//! enumeration-tree node, keyed by the set of scheduled instructions, with
//! the dominance test that prunes provably non-improving subtrees.
//!
//! Records live in an index-based arena and link to their parents by index;
//! the whole arena is released as a unit when an enumeration pass ends.

use crate::data_structures::{
  cycle_of, mkHistIx, BitVec, HistIx, InstCount, InstIx, TypedIxVec,
  INVALID_VALUE,
};
use crate::dep_graph::DataDepGraph;
use crate::machine_model::MachineModel;
use crate::region::SpillCostFunc;
use smallvec::SmallVec;
use std::hash::Hasher;

//=============================================================================
// Reserve slots

/// A cycle range during which an issue slot is held by an earlier
/// unpipelined instruction.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ReserveSlot {
  pub strt_cycle: InstCount,
  pub end_cycle: InstCount,
}

impl ReserveSlot {
  pub fn free() -> ReserveSlot {
    ReserveSlot { strt_cycle: INVALID_VALUE, end_cycle: INVALID_VALUE }
  }

  pub fn is_free(&self) -> bool {
    self.strt_cycle == INVALID_VALUE
  }

  pub fn blocks(&self, cycle: InstCount) -> bool {
    !self.is_free() && cycle >= self.strt_cycle && cycle <= self.end_cycle
  }
}

//=============================================================================
// History records

/// Cost information carried by a record.  The cost-aware variant is what the
/// spill-cost enumerator uses; the plain variant prunes on structure alone.
#[derive(Copy, Clone, Debug)]
pub enum HistCostInfo {
  Plain,
  Cost {
    cost: InstCount,
    peak_spill_cost: InstCount,
    spill_cost_sum: InstCount,
    is_lngth_fsbl: bool,
  },
}

#[derive(Clone, Debug)]
pub struct HistNode {
  pub prev: Option<HistIx>,
  pub time: InstCount,
  /// The instruction issued at `time`, or None for a stall.
  pub inst: Option<InstIx>,
  pub crnt_cycle_blkd: bool,
  pub rsrv_slots: Option<Box<[ReserveSlot]>>,
  pub cost: HistCostInfo,
}

/// A view of the candidate enumeration-tree node being tested against a
/// stored record.
pub struct DomCand<'a> {
  pub time: InstCount,
  pub crnt_cycle_blkd: bool,
  pub rsrv_slots: Option<&'a [ReserveSlot]>,
  /// Dynamic forward lower bounds, indexed by real instruction number.
  pub frwrd_lwr_bounds: &'a [InstCount],
  pub cost: InstCount,
  pub spill_cost_sum: InstCount,
}

/// Scratch buffers for the dominance test, acquired once per enumeration.
pub struct DomScratch {
  last_insts: Vec<Option<InstIx>>,
  insts_per_type: Vec<InstCount>,
  nxt_avlbl_cycles: Vec<InstCount>,
  othr_schduld: BitVec,
}

impl DomScratch {
  pub fn new(ddg: &DataDepGraph, mach_mdl: &MachineModel) -> DomScratch {
    let window =
      ((ddg.max_ltncy() + 2) * mach_mdl.issue_rate() + 2) as usize;
    DomScratch {
      last_insts: vec![None; window],
      insts_per_type: vec![0; mach_mdl.issue_type_cnt()],
      nxt_avlbl_cycles: vec![0; mach_mdl.issue_type_cnt()],
      othr_schduld: BitVec::new(ddg.inst_cnt() as u32),
    }
  }
}

#[derive(Clone, Debug, Default)]
pub struct HistStats {
  pub subset_matches: u64,
  pub abslut_dmnnt_hits: u64,
}

//=============================================================================
// The table

pub struct HistTable {
  pool: TypedIxVec<HistIx, HistNode>,
  buckets: Vec<SmallVec<[HistIx; 4]>>,
  hash_mask: u64,
}

impl HistTable {
  pub fn new(hash_bits: u16) -> HistTable {
    let bits = hash_bits.max(4).min(24);
    let n_buckets = 1usize << bits;
    HistTable {
      pool: TypedIxVec::new(),
      buckets: vec![SmallVec::new(); n_buckets],
      hash_mask: (n_buckets - 1) as u64,
    }
  }

  /// Bulk release: forget every record.
  pub fn reset(&mut self) {
    self.pool.clear();
    for b in self.buckets.iter_mut() {
      b.clear();
    }
  }

  pub fn rec_cnt(&self) -> u32 {
    self.pool.len()
  }

  pub fn node(&self, hix: HistIx) -> &HistNode {
    &self.pool[hix]
  }

  fn hash(&self, key: &BitVec) -> usize {
    let mut hasher = rustc_hash::FxHasher::default();
    for w in key.words() {
      hasher.write_u64(*w);
    }
    (hasher.finish() & self.hash_mask) as usize
  }

  /// Insert a record under the given scheduled-instruction set.
  pub fn add(&mut self, node: HistNode, key: &BitVec) -> HistIx {
    debug_assert!(node.prev.map_or(true, |p| self.pool[p].time + 1
      == node.time));
    let hix = mkHistIx(self.pool.len());
    self.pool.push(node);
    let h = self.hash(key);
    self.buckets[h].push(hix);
    hix
  }

  /// All records stored under the same key hash.  Callers still need the
  /// match test; this is just the bucket.
  pub fn bucket(&self, key: &BitVec) -> &[HistIx] {
    &self.buckets[self.hash(key)]
  }

  /// Collect the instruction set of a record's partial schedule.
  pub fn set_insts_schduld(&self, hix: HistIx, out: &mut BitVec) {
    out.reset();
    let mut crnt = Some(hix);
    while let Some(c) = crnt {
      let node = &self.pool[c];
      if let Some(i) = node.inst {
        debug_assert!(!out.get(i));
        out.set(i);
      }
      crnt = node.prev;
    }
  }

  /// Set equality of the scheduled-instruction sets: the match test.
  pub fn does_match(
    &self, hix: HistIx, cand_schduld: &BitVec, scratch: &mut DomScratch,
  ) -> bool {
    self.set_insts_schduld(hix, &mut scratch.othr_schduld);
    scratch.othr_schduld == *cand_schduld
  }

  /// Re-key a record onto an earlier-discovered equivalent predecessor.
  pub fn replace_parent(&mut self, hix: HistIx, new_parent: HistIx) {
    debug_assert!(hix != new_parent);
    debug_assert!(self.pool[hix].prev.is_some());
    debug_assert!(
      self.pool[new_parent].time
        <= self.pool[self.pool[hix].prev.unwrap()].time
    );
    let new_time = self.pool[new_parent].time + 1;
    self.pool[hix].prev = Some(new_parent);
    self.pool[hix].time = new_time;
  }

  //===========================================================================
  // The dominance test

  /// Does the stored record `hix` dominate the candidate node?  All the
  /// structural conditions plus, for cost-aware records with a feasible
  /// subtree, the cost condition.  The caller has already established that
  /// the two scheduled-instruction sets are equal.
  pub fn does_dominate(
    &self, hix: HistIx, cand: &DomCand, ddg: &DataDepGraph,
    mach_mdl: &MachineModel, schduld: &BitVec,
    spill_cost_func: SpillCostFunc, scratch: &mut DomScratch,
    stats: &mut HistStats,
  ) -> bool {
    let h = &self.pool[hix];
    let this_time = h.time;

    // No decision is possible if the stored node lies deeper in the tree
    // than the candidate.
    if this_time > cand.time {
      return false;
    }
    let shft = cand.time - this_time;
    if shft > 0 {
      stats.subset_matches += 1;
    }

    if cand.crnt_cycle_blkd != h.crnt_cycle_blkd {
      return false;
    }

    if let Some(h_rsrv) = &h.rsrv_slots {
      let n_rsrv = match cand.rsrv_slots {
        None => return false,
        Some(r) => r,
      };
      for (hs, ns) in h_rsrv.iter().zip(n_rsrv.iter()) {
        if !hs.is_free() && (ns.is_free() || hs.end_cycle > ns.end_cycle) {
          return false;
        }
      }
    }

    let issue_rate = mach_mdl.issue_rate();
    let crnt_cycle = cycle_of(this_time, issue_rate);
    let min_cycle_to_exmn = (crnt_cycle + 1 - ddg.max_ltncy()).max(0);
    let min_time_to_exmn = min_cycle_to_exmn * issue_rate + 1;

    // Trace the record's partial schedule back to min_time_to_exmn;
    // instructions issued before that horizon can no longer push any
    // unscheduled successor.
    let entry_cnt = (this_time - min_time_to_exmn + 1).max(0) as usize;
    debug_assert!(entry_cnt <= scratch.last_insts.len());
    {
      let mut crnt = Some(hix);
      let mut indx = 0;
      let mut time = this_time;
      while time >= min_time_to_exmn {
        let node = &self.pool[crnt.expect("history chain too short")];
        debug_assert!(node.time == time);
        scratch.last_insts[indx] = node.inst;
        crnt = node.prev;
        indx += 1;
        time -= 1;
      }
    }

    self.cmput_nxt_avlbl_cycles(hix, ddg, mach_mdl, scratch);

    let mut is_abslut_dmnnt = true;
    for indx in 0..entry_cnt {
      let time = this_time - indx as InstCount;
      let cycle_num = cycle_of(time, issue_rate);
      let inst = match scratch.last_insts[indx] {
        None => continue,
        Some(i) => i,
      };
      // Only an instruction issued after its static lower bound can push a
      // successor down, unless a time shift is in play.
      if cycle_num <= ddg.inst(inst).frwrd_lwr_bound && shft == 0 {
        continue;
      }
      for e in ddg.inst(inst).scsrs.iter() {
        let s = e.other;
        if !ddg.is_real(s) || schduld.get(s) {
          continue;
        }
        let nxt_avlbl =
          scratch.nxt_avlbl_cycles[ddg.inst(s).issu_type as usize];
        let this_bound = (cycle_num + e.ltncy).max(nxt_avlbl);
        let norm_bound = ddg.inst(s).frwrd_lwr_bound.max(nxt_avlbl);
        if this_bound > norm_bound || shft > 0 {
          is_abslut_dmnnt = false;
          let othr_bound = cand.frwrd_lwr_bounds[s.get_usize()];
          if this_bound + shft > othr_bound {
            return false;
          }
        }
      }
    }

    if is_abslut_dmnnt {
      stats.abslut_dmnnt_hits += 1;
    }

    match h.cost {
      HistCostInfo::Plain => true,
      HistCostInfo::Cost { cost, spill_cost_sum, is_lngth_fsbl, .. } => {
        // With no feasible schedule below the stored node, structural
        // domination alone kills the candidate.
        if !is_lngth_fsbl {
          return true;
        }
        if cost > cand.cost {
          return false;
        }
        // Guard the fraction lost to integer division from producing a
        // false domination under the peak-plus-average function.
        if spill_cost_func == SpillCostFunc::PeakPlusAvg
          && cost == cand.cost
        {
          let n = ddg.inst_cnt();
          if spill_cost_sum % n > cand.spill_cost_sum % n {
            return false;
          }
        }
        true
      }
    }
  }

  /// Per-issue-type next available cycle, derived from the record's prefix
  /// within its current cycle: a type whose slots are all taken cannot
  /// issue again before the next cycle.
  fn cmput_nxt_avlbl_cycles(
    &self, hix: HistIx, ddg: &DataDepGraph, mach_mdl: &MachineModel,
    scratch: &mut DomScratch,
  ) {
    let issue_rate = mach_mdl.issue_rate();
    let this_time = self.pool[hix].time;
    let crnt_cycle = cycle_of(this_time, issue_rate);

    for it in 0..mach_mdl.issue_type_cnt() {
      scratch.insts_per_type[it] = 0;
      scratch.nxt_avlbl_cycles[it] = crnt_cycle;
    }

    let mut crnt = Some(hix);
    let mut time = this_time;
    while let Some(c) = crnt {
      if time < 1 || cycle_of(time, issue_rate) != crnt_cycle {
        break;
      }
      if let Some(i) = self.pool[c].inst {
        let it = ddg.inst(i).issu_type as usize;
        scratch.insts_per_type[it] += 1;
        if scratch.insts_per_type[it]
          == mach_mdl.slots_per_cycle(it as u16)
        {
          scratch.nxt_avlbl_cycles[it] = crnt_cycle + 1;
        }
      }
      crnt = self.pool[c].prev;
      time -= 1;
    }
  }
}

//=============================================================================

#[cfg(test)]
mod test {
  use super::*;
  use crate::data_structures::mkInstIx;
  use crate::dep_graph::{DdgBuilder, LatencyPrecision};
  use crate::machine_model::{
    DepKind, IssueTypeInfo, MachineModel, RegTypeInfo,
  };

  fn model(issue_rate: InstCount) -> MachineModel {
    MachineModel::new(
      "test",
      issue_rate,
      vec![IssueTypeInfo {
        name: "all".to_string(),
        slots_per_cycle: issue_rate,
      }],
      vec![RegTypeInfo { name: "GPR".to_string(), phys_reg_cnt: 4 }],
      vec![],
    )
    .unwrap()
  }

  /// Four independent instructions, except i3 depends on i0 with latency 2.
  fn ddg(mm: &MachineModel) -> DataDepGraph {
    let mut b = DdgBuilder::new(mm, LatencyPrecision::Rough, false, 0);
    let i0 = b.add_inst("a", "Default");
    let _ = b.add_inst("b", "Default");
    let _ = b.add_inst("c", "Default");
    let i3 = b.add_inst("d", "Default");
    b.add_edge(i0, i3, 2, DepKind::Data);
    b.finish().unwrap()
  }

  fn plain_cost() -> HistCostInfo {
    HistCostInfo::Cost {
      cost: 0,
      peak_spill_cost: 0,
      spill_cost_sum: 0,
      is_lngth_fsbl: true,
    }
  }

  /// Record a chain of issues starting at time 1, returning the last record.
  fn record_chain(
    table: &mut HistTable, key_univ: u32, insts: &[Option<u32>],
  ) -> (HistIx, BitVec) {
    let mut key = BitVec::new(key_univ);
    let mut prev = None;
    let mut hix = mkHistIx(0);
    for (k, inst) in insts.iter().enumerate() {
      if let Some(i) = inst {
        key.set(mkInstIx(*i));
      }
      let node = HistNode {
        prev,
        time: k as InstCount + 1,
        inst: inst.map(mkInstIx),
        crnt_cycle_blkd: false,
        rsrv_slots: None,
        cost: plain_cost(),
      };
      hix = table.add(node, &key);
      prev = Some(hix);
    }
    (hix, key)
  }

  #[test]
  fn test_exact_match_dominates() {
    let mm = model(1);
    let g = ddg(&mm);
    let mut table = HistTable::new(8);
    let mut scratch = DomScratch::new(&g, &mm);
    let mut stats = HistStats::default();

    // Schedule {i1, i2} in both orders; each issues at its static bound, so
    // the stored record dominates absolutely.
    let (h, key) = record_chain(&mut table, 4, &[Some(1), Some(2)]);
    let bounds = vec![0, 0, 0, 2];
    let cand = DomCand {
      time: 2,
      crnt_cycle_blkd: false,
      rsrv_slots: None,
      frwrd_lwr_bounds: &bounds,
      cost: 0,
      spill_cost_sum: 0,
    };
    assert!(table.does_match(h, &key, &mut scratch));
    assert!(table.does_dominate(
      h,
      &cand,
      &g,
      &mm,
      &key,
      SpillCostFunc::Perp,
      &mut scratch,
      &mut stats
    ));
    assert_eq!(stats.abslut_dmnnt_hits, 1);
    assert_eq!(stats.subset_matches, 0);
  }

  #[test]
  fn test_deeper_record_cannot_dominate() {
    let mm = model(1);
    let g = ddg(&mm);
    let mut table = HistTable::new(8);
    let mut scratch = DomScratch::new(&g, &mm);
    let mut stats = HistStats::default();

    let (h, key) = record_chain(&mut table, 4, &[Some(1), None, Some(2)]);
    let bounds = vec![0, 0, 0, 2];
    let cand = DomCand {
      time: 2,
      crnt_cycle_blkd: false,
      rsrv_slots: None,
      frwrd_lwr_bounds: &bounds,
      cost: 0,
      spill_cost_sum: 0,
    };
    assert!(!table.does_dominate(
      h,
      &cand,
      &g,
      &mm,
      &key,
      SpillCostFunc::Perp,
      &mut scratch,
      &mut stats
    ));
  }

  #[test]
  fn test_pushed_down_successor_blocks_domination() {
    let mm = model(1);
    let g = ddg(&mm);
    let mut table = HistTable::new(8);
    let mut scratch = DomScratch::new(&g, &mm);
    let mut stats = HistStats::default();

    // i0 issued at cycle 1 (one past its static bound of 0) pushes i3 to
    // cycle 3.  A candidate whose dynamic bound for i3 is only 2 must not
    // be pruned; one at 3 may be.
    let (h, key) = record_chain(&mut table, 4, &[Some(1), Some(0)]);
    let tight = vec![0, 0, 0, 2];
    let cand_tight = DomCand {
      time: 2,
      crnt_cycle_blkd: false,
      rsrv_slots: None,
      frwrd_lwr_bounds: &tight,
      cost: 0,
      spill_cost_sum: 0,
    };
    assert!(!table.does_dominate(
      h,
      &cand_tight,
      &g,
      &mm,
      &key,
      SpillCostFunc::Perp,
      &mut scratch,
      &mut stats
    ));

    let loose = vec![0, 0, 0, 3];
    let cand_loose = DomCand { frwrd_lwr_bounds: &loose, ..cand_tight };
    assert!(table.does_dominate(
      h,
      &cand_loose,
      &g,
      &mm,
      &key,
      SpillCostFunc::Perp,
      &mut scratch,
      &mut stats
    ));
  }

  #[test]
  fn test_subset_match_shift() {
    let mm = model(1);
    let g = ddg(&mm);
    let mut table = HistTable::new(8);
    let mut scratch = DomScratch::new(&g, &mm);
    let mut stats = HistStats::default();

    // Stored: i0 at time 1.  Candidate: same set but one stall deeper.
    // The shift adds 1 to every bound the stored prefix implies: i3 is
    // implied at cycle 0+2, shifted to 3.
    let (h, key) = record_chain(&mut table, 4, &[Some(0)]);
    let loose = vec![0, 0, 0, 3];
    let cand = DomCand {
      time: 2,
      crnt_cycle_blkd: false,
      rsrv_slots: None,
      frwrd_lwr_bounds: &loose,
      cost: 0,
      spill_cost_sum: 0,
    };
    assert!(table.does_dominate(
      h,
      &cand,
      &g,
      &mm,
      &key,
      SpillCostFunc::Perp,
      &mut scratch,
      &mut stats
    ));
    assert_eq!(stats.subset_matches, 1);

    let tight = vec![0, 0, 0, 2];
    let cand_tight = DomCand { frwrd_lwr_bounds: &tight, ..cand };
    assert!(!table.does_dominate(
      h,
      &cand_tight,
      &g,
      &mm,
      &key,
      SpillCostFunc::Perp,
      &mut scratch,
      &mut stats
    ));
  }

  #[test]
  fn test_cycle_blocked_mismatch() {
    let mm = model(1);
    let g = ddg(&mm);
    let mut table = HistTable::new(8);
    let mut scratch = DomScratch::new(&g, &mm);
    let mut stats = HistStats::default();

    let (h, key) = record_chain(&mut table, 4, &[Some(1)]);
    let bounds = vec![0, 0, 0, 2];
    let cand = DomCand {
      time: 1,
      crnt_cycle_blkd: true,
      rsrv_slots: None,
      frwrd_lwr_bounds: &bounds,
      cost: 0,
      spill_cost_sum: 0,
    };
    assert!(!table.does_dominate(
      h,
      &cand,
      &g,
      &mm,
      &key,
      SpillCostFunc::Perp,
      &mut scratch,
      &mut stats
    ));
  }

  #[test]
  fn test_rsrv_slot_rule() {
    let mm = model(1);
    let g = ddg(&mm);
    let mut table = HistTable::new(8);
    let mut scratch = DomScratch::new(&g, &mm);
    let mut stats = HistStats::default();

    let mut key = BitVec::new(4);
    key.set(mkInstIx(1));
    let rsrv: Box<[ReserveSlot]> =
      vec![ReserveSlot { strt_cycle: 0, end_cycle: 2 }].into();
    let node = HistNode {
      prev: None,
      time: 1,
      inst: Some(mkInstIx(1)),
      crnt_cycle_blkd: false,
      rsrv_slots: Some(rsrv),
      cost: plain_cost(),
    };
    let h = table.add(node, &key);

    let bounds = vec![0, 0, 0, 2];
    // Candidate with no reservation at all: the stored reservation is
    // strictly more constrained, so it cannot dominate.
    let cand = DomCand {
      time: 1,
      crnt_cycle_blkd: false,
      rsrv_slots: None,
      frwrd_lwr_bounds: &bounds,
      cost: 0,
      spill_cost_sum: 0,
    };
    assert!(!table.does_dominate(
      h,
      &cand,
      &g,
      &mm,
      &key,
      SpillCostFunc::Perp,
      &mut scratch,
      &mut stats
    ));

    // Candidate reserving at least as far: fine.
    let longer = [ReserveSlot { strt_cycle: 0, end_cycle: 3 }];
    let cand_ok = DomCand { rsrv_slots: Some(&longer[..]), ..cand };
    assert!(table.does_dominate(
      h,
      &cand_ok,
      &g,
      &mm,
      &key,
      SpillCostFunc::Perp,
      &mut scratch,
      &mut stats
    ));

    // Candidate reserving a shorter range: the stored node had more
    // freedom ahead of it, so no conclusion.
    let shorter = [ReserveSlot { strt_cycle: 0, end_cycle: 1 }];
    let cand_short = DomCand { rsrv_slots: Some(&shorter[..]), ..cand };
    assert!(!table.does_dominate(
      h,
      &cand_short,
      &g,
      &mm,
      &key,
      SpillCostFunc::Perp,
      &mut scratch,
      &mut stats
    ));
  }

  #[test]
  fn test_cost_rules() {
    let mm = model(1);
    let g = ddg(&mm);
    let mut scratch = DomScratch::new(&g, &mm);
    let mut stats = HistStats::default();

    let mk_node = |cost, sum, fsbl| HistNode {
      prev: None,
      time: 1,
      inst: Some(mkInstIx(1)),
      crnt_cycle_blkd: false,
      rsrv_slots: None,
      cost: HistCostInfo::Cost {
        cost,
        peak_spill_cost: cost,
        spill_cost_sum: sum,
        is_lngth_fsbl: fsbl,
      },
    };
    let bounds = vec![0, 0, 0, 2];
    let cand = DomCand {
      time: 1,
      crnt_cycle_blkd: false,
      rsrv_slots: None,
      frwrd_lwr_bounds: &bounds,
      cost: 3,
      spill_cost_sum: 5,
    };
    let mut key = BitVec::new(4);
    key.set(mkInstIx(1));

    // Cheaper stored record dominates; costlier does not.
    let mut table = HistTable::new(8);
    let cheap = table.add(mk_node(2, 5, true), &key);
    let dear = table.add(mk_node(4, 5, true), &key);
    assert!(table.does_dominate(
      cheap, &cand, &g, &mm, &key, SpillCostFunc::Peak, &mut scratch,
      &mut stats
    ));
    assert!(!table.does_dominate(
      dear, &cand, &g, &mm, &key, SpillCostFunc::Peak, &mut scratch,
      &mut stats
    ));

    // An infeasible record prunes regardless of cost.
    let infsbl = table.add(mk_node(9, 9, false), &key);
    assert!(table.does_dominate(
      infsbl, &cand, &g, &mm, &key, SpillCostFunc::Peak, &mut scratch,
      &mut stats
    ));

    // PEAK_PLUS_AVG tie-break: equal cost, but the stored sum leaves a
    // bigger remainder mod N, so the division may have hidden a real
    // difference.  N = 4 here; 7 mod 4 = 3 > 5 mod 4 = 1.
    let tie = table.add(mk_node(3, 7, true), &key);
    assert!(table.does_dominate(
      tie, &cand, &g, &mm, &key, SpillCostFunc::Peak, &mut scratch,
      &mut stats
    ));
    assert!(!table.does_dominate(
      tie,
      &cand,
      &g,
      &mm,
      &key,
      SpillCostFunc::PeakPlusAvg,
      &mut scratch,
      &mut stats
    ));
  }

  #[test]
  fn test_replace_parent() {
    let mm = model(1);
    let g = ddg(&mm);
    let mut table = HistTable::new(8);
    let mut scratch = DomScratch::new(&g, &mm);

    // Chain A: i1 at time 1, then a stall, then another stall at time 3.
    let (deep, key) = record_chain(&mut table, 4, &[Some(1), None, None]);
    // Chain B: i1 at time 1 (recorded separately).
    let (shallow, _) = record_chain(&mut table, 4, &[Some(1)]);

    // Re-keying the deep stall record onto the shallow equivalent pulls
    // its time in while keeping the same instruction set.
    table.replace_parent(deep, shallow);
    assert_eq!(table.node(deep).time, 2);
    assert!(table.does_match(deep, &key, &mut scratch));
  }
}
