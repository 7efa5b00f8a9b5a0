/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! The branch-and-bound enumerator.  Walks a tree of partial schedules one
//! issue-slot step at a time, consulting the history table to prune
//! subtrees that provably cannot beat the incumbent, and hands back the
//! best complete schedule found at the current target length.
//!
//! All mutable annotations (scheduled flags, dynamic forward bounds, live
//! register state, slot counts) live in side tables owned by the
//! enumerator, never on the graph; every exit path drops them as a unit.

use crate::data_structures::{
  cycle_of, mkEtnIx, slot_of, BitVec, EtnIx, HistIx, InstCount, InstIx,
  RegIx, TypedIxVec, INVALID_VALUE,
};
use crate::dep_graph::DataDepGraph;
use crate::hist_table::{
  DomCand, DomScratch, HistCostInfo, HistNode, HistStats, HistTable,
  ReserveSlot,
};
use crate::interface::{SchedError, Schedule, SchedulerOptions};
use crate::machine_model::{DepKind, MachineModel};
use crate::ready_list::KeyedPrirts;
use crate::region::SpillCostFunc;
use log::{debug, trace};
use smallvec::SmallVec;
use std::time::Instant;

//=============================================================================
// Statistics

#[derive(Clone, Debug, Default)]
pub struct EnumStats {
  pub nodes_crtd: u64,
  pub hist_matches: u64,
  pub hist_prunes: u64,
  pub cost_prunes: u64,
  pub lngth_infsbl_prunes: u64,
  pub feasible_scheds: u64,
  pub backtracks: u64,
  pub hist: HistStats,
}

//=============================================================================
// Enumeration tree nodes

struct EnumTreeNode {
  prnt: Option<EtnIx>,
  /// The instruction issued at `time`, or None for a stall.
  inst: Option<InstIx>,
  time: InstCount,
  crnt_cycle_blkd: bool,
  rsrv_slots: Option<Vec<ReserveSlot>>,
  /// Dynamic earliest issue cycles, indexed by real instruction number.
  frwrd_lwr_bounds: Vec<InstCount>,
  /// Busy length of the scheduled prefix, in cycles.
  len_done: InstCount,
  cost: InstCount,
  peak_spill_cost: InstCount,
  spill_cost_sum: InstCount,
  is_lngth_fsbl: bool,
  hstry: Option<HistIx>,
  /// Children in priority order, stall last; `nxt_brnch` is the cursor.
  brnchs: Vec<Option<InstIx>>,
  nxt_brnch: usize,
  // Undo bookkeeping for the global side tables.
  new_cycle_strtd: bool,
  prev_slot_cnts: Vec<InstCount>,
  rdy_newly: SmallVec<[InstIx; 4]>,
  actvtd_regs: SmallVec<[RegIx; 4]>,
  killed_regs: SmallVec<[RegIx; 4]>,
}

pub struct EnumResult {
  pub best: Option<Schedule>,
  pub timed_out: bool,
}

//=============================================================================
// The enumerator

pub struct Enumerator<'a> {
  ddg: &'a DataDepGraph,
  mach_mdl: &'a MachineModel,
  spill_cost_func: SpillCostFunc,
  spill_cost_factor: InstCount,
  enumerate_stalls: bool,
  trgt_lngth: InstCount,
  sched_lwr_bound: InstCount,
  keyed: KeyedPrirts,

  // Incumbent bound, updated as feasible schedules are found.
  uppr_cost: InstCount,
  uppr_lngth: InstCount,
  best: Option<Schedule>,

  // Side tables.
  schduld: BitVec,
  schduld_cnt: InstCount,
  prdcsr_wait: TypedIxVec<InstIx, InstCount>,
  rdy: Vec<InstIx>,
  slot_cnts: Vec<InstCount>,
  is_live: TypedIxVec<RegIx, bool>,
  def_done: TypedIxVec<RegIx, InstCount>,
  use_done: TypedIxVec<RegIx, InstCount>,
  live_wght: Vec<InstCount>,
  live_cnt: Vec<InstCount>,
  /// Backward bound plus trailing occupancy for unpipelined instructions.
  bkwrd_eff: TypedIxVec<InstIx, InstCount>,

  nodes: TypedIxVec<EtnIx, EnumTreeNode>,
  crnt: EtnIx,
  hist: HistTable,
  scratch: DomScratch,
  stats: EnumStats,
}

impl<'a> Enumerator<'a> {
  pub fn new(
    ddg: &'a DataDepGraph, mach_mdl: &'a MachineModel,
    opts: &SchedulerOptions, trgt_lngth: InstCount,
    sched_lwr_bound: InstCount, uppr_cost: InstCount, uppr_lngth: InstCount,
  ) -> Enumerator<'a> {
    let n = ddg.inst_cnt();
    let keyed = KeyedPrirts::new(ddg, &opts.enum_prirts);

    let mut prdcsr_wait = TypedIxVec::new();
    for ix in ddg.real_insts() {
      let cnt = ddg
        .inst(ix)
        .prdcsrs
        .iter()
        .filter(|e| e.other != ddg.root())
        .count();
      prdcsr_wait.push(cnt as InstCount);
    }
    let rdy: Vec<InstIx> =
      ddg.real_insts().filter(|ix| prdcsr_wait[*ix] == 0).collect();

    let mut bkwrd_eff = TypedIxVec::new();
    for ix in ddg.real_insts() {
      let inst = ddg.inst(ix);
      let mut bb = inst.bkwrd_lwr_bound;
      if !mach_mdl.is_pipelined(inst.inst_type) {
        bb = bb.max(mach_mdl.latency(inst.inst_type, DepKind::Data) - 1);
      }
      bkwrd_eff.push(bb);
    }

    let mut is_live = TypedIxVec::new();
    let mut def_done = TypedIxVec::new();
    let mut use_done = TypedIxVec::new();
    let mut live_wght = vec![0; mach_mdl.reg_type_cnt()];
    let mut live_cnt = vec![0; mach_mdl.reg_type_cnt()];
    for rix in ddg.regs_iter() {
      let reg = ddg.reg(rix);
      // Live-in registers are live from the very start.
      let live = reg.is_live_in;
      if live {
        live_wght[reg.reg_type as usize] += reg.wght;
        live_cnt[reg.reg_type as usize] += 1;
      }
      is_live.push(live);
      def_done.push(0);
      use_done.push(0);
    }

    let scratch = DomScratch::new(ddg, mach_mdl);
    Enumerator {
      ddg,
      mach_mdl,
      spill_cost_func: opts.spill_cost_func,
      spill_cost_factor: opts.spill_cost_factor,
      enumerate_stalls: opts.enumerate_stalls,
      trgt_lngth,
      sched_lwr_bound,
      keyed,
      uppr_cost,
      uppr_lngth,
      best: None,
      schduld: BitVec::new(n as u32),
      schduld_cnt: 0,
      prdcsr_wait,
      rdy,
      slot_cnts: vec![0; mach_mdl.issue_type_cnt()],
      is_live,
      def_done,
      use_done,
      live_wght,
      live_cnt,
      bkwrd_eff,
      nodes: TypedIxVec::new(),
      crnt: mkEtnIx(0),
      hist: HistTable::new(opts.hist_table_hash_bits),
      scratch,
      stats: EnumStats::default(),
    }
  }

  pub fn stats(&self) -> &EnumStats {
    &self.stats
  }

  /// Run the search at the configured target length.  Returns the best
  /// improving schedule found, if any.
  pub fn enumerate(
    &mut self, deadline: Option<Instant>,
  ) -> Result<EnumResult, SchedError> {
    debug!(
      "enumerating at target length {}, upper bound cost {}",
      self.trgt_lngth, self.uppr_cost
    );
    self.mk_root_node();

    loop {
      if let Some(d) = deadline {
        if Instant::now() >= d {
          debug!("deadline hit after {} nodes", self.stats.nodes_crtd);
          return Ok(EnumResult { best: self.best.take(), timed_out: true });
        }
      }

      let node = &self.nodes[self.crnt];
      if node.nxt_brnch < node.brnchs.len() {
        let brnch = node.brnchs[node.nxt_brnch];
        self.nodes[self.crnt].nxt_brnch += 1;
        if self.step_frwrd(brnch)? {
          if self.schduld_cnt == self.ddg.inst_cnt() {
            self.record_sched();
            if self.uppr_cost == 0 {
              // The objective cannot go below zero.
              return Ok(EnumResult {
                best: self.best.take(),
                timed_out: false,
              });
            }
          }
        }
      } else if self.nodes[self.crnt].prnt.is_none() {
        // The root's branches are exhausted: the space is fully explored.
        return Ok(EnumResult { best: self.best.take(), timed_out: false });
      } else {
        self.back_track();
      }
    }
  }

  //===========================================================================
  // Node construction

  fn mk_root_node(&mut self) {
    debug_assert!(self.ddg.inst_cnt() > 0);
    let bounds: Vec<InstCount> = self
      .ddg
      .real_insts()
      .map(|ix| self.ddg.inst(ix).frwrd_lwr_bound)
      .collect();
    let (s_wght, s_cnt) = self.crnt_spill();
    let v = self.spill_quantity(s_wght, s_cnt);
    let len_lb = self.len_lwr_bound(&bounds, 0);
    let cost = self.cmput_cost(len_lb, v, v);
    let root = EnumTreeNode {
      prnt: None,
      inst: None,
      time: 0,
      crnt_cycle_blkd: false,
      rsrv_slots: None,
      frwrd_lwr_bounds: bounds,
      len_done: 0,
      cost,
      peak_spill_cost: v,
      spill_cost_sum: v,
      is_lngth_fsbl: len_lb <= self.trgt_lngth,
      hstry: None,
      brnchs: Vec::new(),
      nxt_brnch: 0,
      new_cycle_strtd: false,
      prev_slot_cnts: Vec::new(),
      rdy_newly: SmallVec::new(),
      actvtd_regs: SmallVec::new(),
      killed_regs: SmallVec::new(),
    };
    self.nodes.clear();
    self.nodes.push(root);
    self.crnt = mkEtnIx(0);
    let brnchs = self.cmput_brnchs(self.crnt);
    self.nodes[self.crnt].brnchs = brnchs;
  }

  /// One enumeration step: issue `brnch` (or a stall) at the next time
  /// slot.  Returns true if the search descended into the new node, false
  /// if it was pruned (in which case all state changes are undone).
  fn step_frwrd(&mut self, brnch: Option<InstIx>) -> Result<bool, SchedError> {
    let ddg = self.ddg;
    let issue_rate = self.mach_mdl.issue_rate();
    let prnt_ix = self.crnt;
    let prnt_time = self.nodes[prnt_ix].time;
    let nxt_time = prnt_time + 1;
    let cy = cycle_of(nxt_time, issue_rate);
    let sl = slot_of(nxt_time, issue_rate) as usize;
    let new_cycle = sl == 0;

    let mut bounds = self.nodes[prnt_ix].frwrd_lwr_bounds.clone();
    let mut rsrv_slots = self.nodes[prnt_ix].rsrv_slots.clone();
    let mut crnt_cycle_blkd =
      if new_cycle { false } else { self.nodes[prnt_ix].crnt_cycle_blkd };
    let mut len_done = self.nodes[prnt_ix].len_done;
    let prnt_peak = self.nodes[prnt_ix].peak_spill_cost;
    let prnt_sum = self.nodes[prnt_ix].spill_cost_sum;

    let mut prev_slot_cnts = Vec::new();
    if new_cycle {
      prev_slot_cnts = self.slot_cnts.clone();
      for c in self.slot_cnts.iter_mut() {
        *c = 0;
      }
    }

    let mut rdy_newly: SmallVec<[InstIx; 4]> = SmallVec::new();
    let mut actvtd_regs: SmallVec<[RegIx; 4]> = SmallVec::new();
    let mut killed_regs: SmallVec<[RegIx; 4]> = SmallVec::new();

    if let Some(i) = brnch {
      let inst = ddg.inst(i);
      debug_assert!(!self.schduld.get(i));
      debug_assert!(bounds[i.get_usize()] <= cy);

      self.slot_cnts[inst.issu_type as usize] += 1;
      if self.mach_mdl.blocks_cycle(inst.inst_type) {
        crnt_cycle_blkd = true;
      }
      let busy = if self.mach_mdl.is_pipelined(inst.inst_type) {
        1
      } else {
        let ltncy = self.mach_mdl.latency(inst.inst_type, DepKind::Data);
        let slots =
          rsrv_slots.get_or_insert_with(|| {
            vec![ReserveSlot::free(); issue_rate as usize]
          });
        slots[sl] =
          ReserveSlot { strt_cycle: cy, end_cycle: cy + ltncy - 1 };
        ltncy
      };
      len_done = len_done.max(cy + busy);

      self.schduld.set(i);
      self.schduld_cnt += 1;
      let pos = self
        .rdy
        .iter()
        .position(|r| *r == i)
        .expect("issued instruction was not ready");
      self.rdy.swap_remove(pos);

      for e in inst.scsrs.iter() {
        let s = e.other;
        if !ddg.is_real(s) {
          continue;
        }
        self.prdcsr_wait[s] -= 1;
        let b = &mut bounds[s.get_usize()];
        if *b < cy + e.ltncy {
          *b = cy + e.ltncy;
        }
        if self.prdcsr_wait[s] == 0 {
          self.rdy.push(s);
          rdy_newly.push(s);
        }
      }

      for d in inst.defs.iter() {
        self.def_done[*d] += 1;
        if !self.is_live[*d] {
          let reg = ddg.reg(*d);
          self.is_live[*d] = true;
          self.live_wght[reg.reg_type as usize] += reg.wght;
          self.live_cnt[reg.reg_type as usize] += 1;
          actvtd_regs.push(*d);
        }
      }
      for u in inst.uses.iter() {
        self.use_done[*u] += 1;
      }
    }

    // Accrue the spill cost of this step before closing any live range:
    // a value is live through the cycle of its last use.
    let (s_wght, s_cnt) = self.crnt_spill();
    let v = self.spill_quantity(s_wght, s_cnt);
    let peak_spill_cost = prnt_peak.max(v);
    let spill_cost_sum = prnt_sum + v;

    if let Some(i) = brnch {
      for u in ddg.inst(i).uses.iter() {
        let reg = ddg.reg(*u);
        if self.is_live[*u]
          && !reg.is_live_out
          && self.use_done[*u] == reg.uses.len() as InstCount
        {
          self.is_live[*u] = false;
          self.live_wght[reg.reg_type as usize] -= reg.wght;
          self.live_cnt[reg.reg_type as usize] -= 1;
          killed_regs.push(*u);
        }
      }
    }

    let len_lb = self.len_lwr_bound(&bounds, len_done);
    let is_lngth_fsbl = len_lb <= self.trgt_lngth;
    let cost = self.cmput_cost(len_lb, peak_spill_cost, spill_cost_sum);

    if self.nodes.len() == u32::MAX {
      return Err(SchedError::OutOfMemory(
        "enumeration tree arena exhausted".to_string(),
      ));
    }
    let child_ix = mkEtnIx(self.nodes.len());
    self.nodes.push(EnumTreeNode {
      prnt: Some(prnt_ix),
      inst: brnch,
      time: nxt_time,
      crnt_cycle_blkd,
      rsrv_slots,
      frwrd_lwr_bounds: bounds,
      len_done,
      cost,
      peak_spill_cost,
      spill_cost_sum,
      is_lngth_fsbl,
      hstry: None,
      brnchs: Vec::new(),
      nxt_brnch: 0,
      new_cycle_strtd: new_cycle,
      prev_slot_cnts,
      rdy_newly,
      actvtd_regs,
      killed_regs,
    });
    self.stats.nodes_crtd += 1;
    trace!(
      "step to t={} inst={:?} cost={} lb={}",
      nxt_time,
      brnch,
      cost,
      len_lb
    );

    // Pruning tests, in increasing order of expense.
    if !is_lngth_fsbl {
      self.stats.lngth_infsbl_prunes += 1;
      self.archive(child_ix);
      self.undo_and_pop();
      return Ok(false);
    }
    if cost >= self.uppr_cost {
      self.stats.cost_prunes += 1;
      self.archive(child_ix);
      self.undo_and_pop();
      return Ok(false);
    }
    if let Some(dmnnt) = self.probe_hist(child_ix) {
      self.stats.hist_prunes += 1;
      // A subset match reaches the same instruction set in fewer stalls;
      // re-key this stall's record onto it so later probes walk the
      // shallower history.
      if brnch.is_none() && self.hist.node(dmnnt).time < nxt_time {
        let rec = self.archive(child_ix);
        self.hist.replace_parent(rec, dmnnt);
      }
      self.undo_and_pop();
      return Ok(false);
    }

    let rec = self.archive(child_ix);
    self.nodes[child_ix].hstry = Some(rec);
    let brnchs = self.cmput_brnchs(child_ix);
    self.nodes[child_ix].brnchs = brnchs;
    self.crnt = child_ix;
    Ok(true)
  }

  /// Candidate branches for a node, in priority order.  The global side
  /// tables must reflect that node's partial schedule.
  fn cmput_brnchs(&self, node_ix: EtnIx) -> Vec<Option<InstIx>> {
    let issue_rate = self.mach_mdl.issue_rate();
    let node = &self.nodes[node_ix];
    let nxt_time = node.time + 1;
    if self.schduld_cnt == self.ddg.inst_cnt()
      || nxt_time > self.trgt_lngth * issue_rate
    {
      return Vec::new();
    }
    let cy = cycle_of(nxt_time, issue_rate);
    let sl = slot_of(nxt_time, issue_rate) as usize;
    let new_cycle = sl == 0;

    let blkd = !new_cycle && node.crnt_cycle_blkd;
    // Reservations survive cycle boundaries, so the slot is checked either
    // way.
    let rsrvd = node
      .rsrv_slots
      .as_ref()
      .map_or(false, |slots| slots[sl].blocks(cy));

    let issued_in_cycle: InstCount =
      if new_cycle { 0 } else { self.slot_cnts.iter().sum() };

    let mut cands: Vec<InstIx> = Vec::new();
    if !blkd && !rsrvd {
      for r in self.rdy.iter() {
        let inst = self.ddg.inst(*r);
        if node.frwrd_lwr_bounds[r.get_usize()] > cy {
          continue;
        }
        let used = if new_cycle {
          0
        } else {
          self.slot_cnts[inst.issu_type as usize]
        };
        if used >= self.mach_mdl.slots_per_cycle(inst.issu_type) {
          continue;
        }
        if self.mach_mdl.blocks_cycle(inst.inst_type) && issued_in_cycle > 0
        {
          continue;
        }
        cands.push(*r);
      }
      self.keyed.sort_desc(&mut cands);
    }

    let rmnng_slots = issue_rate - sl as InstCount;
    let stall = if cands.is_empty() {
      true
    } else {
      self.enumerate_stalls && (cands.len() as InstCount) < rmnng_slots
    };

    let mut brnchs: Vec<Option<InstIx>> =
      cands.into_iter().map(Some).collect();
    if stall {
      brnchs.push(None);
    }
    brnchs
  }

  //===========================================================================
  // Cost model

  /// Weighted and unweighted register-pressure excess over the physical
  /// limits, summed over register types.
  fn crnt_spill(&self) -> (InstCount, InstCount) {
    let mut wght = 0;
    let mut cnt = 0;
    for t in 0..self.live_wght.len() {
      let limit = self.mach_mdl.phys_reg_cnt(t as u16);
      wght += (self.live_wght[t] - limit).max(0);
      cnt += (self.live_cnt[t] - limit).max(0);
    }
    (wght, cnt)
  }

  fn spill_quantity(&self, wght: InstCount, cnt: InstCount) -> InstCount {
    crate::region::spill_quantity(self.spill_cost_func, wght, cnt)
  }

  fn cmput_cost(
    &self, len_lb: InstCount, peak: InstCount, sum: InstCount,
  ) -> InstCount {
    let spill = crate::region::aggrgt_spill(
      self.spill_cost_func,
      peak,
      sum,
      self.ddg.inst_cnt(),
    );
    crate::region::cmput_cost(
      len_lb,
      self.sched_lwr_bound,
      spill,
      self.spill_cost_factor,
    )
  }

  /// Lower bound on the busy length of any completion: the busy length so
  /// far, plus critical-path slack of every unscheduled instruction.
  fn len_lwr_bound(
    &self, bounds: &[InstCount], len_done: InstCount,
  ) -> InstCount {
    let mut lb = len_done;
    for ix in self.ddg.real_insts() {
      if self.schduld.get(ix) {
        continue;
      }
      let b = bounds[ix.get_usize()] + self.bkwrd_eff[ix] + 1;
      lb = lb.max(b);
    }
    lb
  }

  //===========================================================================
  // History

  fn archive(&mut self, node_ix: EtnIx) -> HistIx {
    let node = &self.nodes[node_ix];
    let prev = node.prnt.and_then(|p| self.nodes[p].hstry);
    let rec = HistNode {
      prev,
      time: node.time,
      inst: node.inst,
      crnt_cycle_blkd: node.crnt_cycle_blkd,
      rsrv_slots: node
        .rsrv_slots
        .as_ref()
        .map(|v| v.clone().into_boxed_slice()),
      cost: HistCostInfo::Cost {
        cost: node.cost,
        peak_spill_cost: node.peak_spill_cost,
        spill_cost_sum: node.spill_cost_sum,
        is_lngth_fsbl: node.is_lngth_fsbl,
      },
    };
    self.hist.add(rec, &self.schduld)
  }

  fn probe_hist(&mut self, node_ix: EtnIx) -> Option<HistIx> {
    let node = &self.nodes[node_ix];
    let cand = DomCand {
      time: node.time,
      crnt_cycle_blkd: node.crnt_cycle_blkd,
      rsrv_slots: node.rsrv_slots.as_deref(),
      frwrd_lwr_bounds: &node.frwrd_lwr_bounds,
      cost: node.cost,
      spill_cost_sum: node.spill_cost_sum,
    };
    for h in self.hist.bucket(&self.schduld).iter() {
      if !self.hist.does_match(*h, &self.schduld, &mut self.scratch) {
        continue;
      }
      self.stats.hist_matches += 1;
      if self.hist.does_dominate(
        *h,
        &cand,
        self.ddg,
        self.mach_mdl,
        &self.schduld,
        self.spill_cost_func,
        &mut self.scratch,
        &mut self.stats.hist,
      ) {
        return Some(*h);
      }
    }
    None
  }

  //===========================================================================
  // Backtracking

  fn back_track(&mut self) {
    self.stats.backtracks += 1;
    let node = self.undo_and_pop();
    self.crnt = node.prnt.expect("cannot backtrack past the root");
  }

  /// Undo the youngest node's effect on the global side tables and drop it
  /// from the arena.
  fn undo_and_pop(&mut self) -> EnumTreeNode {
    let node = self.nodes.pop().expect("arena empty");
    let ddg = self.ddg;

    if node.new_cycle_strtd {
      self.slot_cnts.copy_from_slice(&node.prev_slot_cnts);
    } else if let Some(i) = node.inst {
      self.slot_cnts[ddg.inst(i).issu_type as usize] -= 1;
    }

    if let Some(i) = node.inst {
      self.schduld.clear(i);
      self.schduld_cnt -= 1;

      for u in node.killed_regs.iter() {
        let reg = ddg.reg(*u);
        self.is_live[*u] = true;
        self.live_wght[reg.reg_type as usize] += reg.wght;
        self.live_cnt[reg.reg_type as usize] += 1;
      }
      for u in ddg.inst(i).uses.iter() {
        self.use_done[*u] -= 1;
      }
      for d in node.actvtd_regs.iter() {
        let reg = ddg.reg(*d);
        self.is_live[*d] = false;
        self.live_wght[reg.reg_type as usize] -= reg.wght;
        self.live_cnt[reg.reg_type as usize] -= 1;
      }
      for d in ddg.inst(i).defs.iter() {
        self.def_done[*d] -= 1;
      }

      for s in node.rdy_newly.iter() {
        let pos = self
          .rdy
          .iter()
          .position(|r| r == s)
          .expect("ready-list undo out of sync");
        self.rdy.swap_remove(pos);
      }
      for e in ddg.inst(i).scsrs.iter() {
        if ddg.is_real(e.other) {
          self.prdcsr_wait[e.other] += 1;
        }
      }
      self.rdy.push(i);
    }

    node
  }

  //===========================================================================
  // Schedule extraction

  fn record_sched(&mut self) {
    let node = &self.nodes[self.crnt];
    debug_assert!(self.schduld_cnt == self.ddg.inst_cnt());
    let lngth = node.len_done;
    let cost = node.cost;
    let better = cost < self.uppr_cost
      || (cost == self.uppr_cost && lngth < self.uppr_lngth);
    self.stats.feasible_scheds += 1;
    if !better {
      return;
    }

    let mut times = TypedIxVec::<InstIx, InstCount>::new();
    times.resize(self.ddg.inst_cnt() as u32, INVALID_VALUE);
    let mut walk = Some(self.crnt);
    while let Some(w) = walk {
      let n = &self.nodes[w];
      if let Some(i) = n.inst {
        times[i] = n.time;
      }
      walk = n.prnt;
    }

    debug!(
      "improving schedule: length {} cost {} (was cost {})",
      lngth, cost, self.uppr_cost
    );
    self.uppr_cost = cost;
    self.uppr_lngth = lngth;
    let node = &self.nodes[self.crnt];
    self.best = Some(Schedule {
      times,
      lngth,
      cost,
      peak_spill_cost: node.peak_spill_cost,
      spill_cost_sum: node.spill_cost_sum,
      is_optml: false,
    });
  }
}
