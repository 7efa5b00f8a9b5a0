/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Per-region orchestration: static bounds, graph transformations, the
//! heuristic upper bound, the per-length enumeration driver with its
//! timeouts, and the cost model shared by the heuristic replay and the
//! enumerator.

use crate::data_structures::{cycle_of, InstCount, InstIx, TypedIxVec};
use crate::dep_graph::DataDepGraph;
use crate::enumerator::Enumerator;
use crate::graph_trans;
use crate::interface::{SchedError, Schedule, SchedulerOptions};
use crate::list_sched::{sched_lngth, schdul_hurstc};
use crate::machine_model::{DepKind, MachineModel};
use log::{debug, info, warn};
use std::time::{Duration, Instant};

//=============================================================================
// Cost model

/// How per-cycle spill costs aggregate into the objective.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SpillCostFunc {
  /// Peak excess register count, unweighted.
  Perp,
  /// Sum of the weighted excess over all steps.
  Sum,
  /// Peak weighted excess.
  Peak,
  /// Peak plus the per-instruction average of the sum.
  PeakPlusAvg,
}

impl SpillCostFunc {
  pub fn from_name(name: &str) -> Result<SpillCostFunc, SchedError> {
    match name {
      "perp" => Ok(SpillCostFunc::Perp),
      "sum" => Ok(SpillCostFunc::Sum),
      "peak" => Ok(SpillCostFunc::Peak),
      "peak-plus-avg" => Ok(SpillCostFunc::PeakPlusAvg),
      _ => Err(SchedError::InvalidConfig(format!(
        "unknown spill cost function '{}'",
        name
      ))),
    }
  }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LowerBoundAlg {
  /// Critical path only.
  RimJain,
  /// Critical path refined by per-issue-type occupancy.
  LangevinCerny,
}

impl LowerBoundAlg {
  pub fn from_name(name: &str) -> Result<LowerBoundAlg, SchedError> {
    match name {
      "rim-jain" => Ok(LowerBoundAlg::RimJain),
      "langevin-cerny" => Ok(LowerBoundAlg::LangevinCerny),
      _ => Err(SchedError::InvalidConfig(format!(
        "unknown lower bound algorithm '{}'",
        name
      ))),
    }
  }
}

/// The per-step quantity the configured function accumulates.
pub(crate) fn spill_quantity(
  func: SpillCostFunc, wght_excess: InstCount, cnt_excess: InstCount,
) -> InstCount {
  match func {
    SpillCostFunc::Perp => cnt_excess,
    _ => wght_excess,
  }
}

/// Aggregate tracked peak/sum into a single spill figure.
pub(crate) fn aggrgt_spill(
  func: SpillCostFunc, peak: InstCount, sum: InstCount, inst_cnt: InstCount,
) -> InstCount {
  match func {
    SpillCostFunc::Peak | SpillCostFunc::Perp => peak,
    SpillCostFunc::Sum => sum,
    SpillCostFunc::PeakPlusAvg => peak + sum / inst_cnt,
  }
}

pub(crate) fn cmput_cost(
  lngth: InstCount, sched_lwr_bound: InstCount, spill: InstCount,
  spill_cost_factor: InstCount,
) -> InstCount {
  (lngth - sched_lwr_bound).max(0) + spill_cost_factor * spill
}

/// Length lower bound for the whole region under the configured algorithm.
pub fn cmput_sched_lwr_bound(
  ddg: &DataDepGraph, mach_mdl: &MachineModel, alg: LowerBoundAlg,
) -> InstCount {
  let mut lb = ddg.sched_lwr_bound();
  if alg == LowerBoundAlg::LangevinCerny {
    let mut per_type = vec![0 as InstCount; mach_mdl.issue_type_cnt()];
    for ix in ddg.real_insts() {
      per_type[ddg.inst(ix).issu_type as usize] += 1;
    }
    for (it, cnt) in per_type.iter().enumerate() {
      let slots = mach_mdl.slots_per_cycle(it as u16);
      lb = lb.max((cnt + slots - 1) / slots);
    }
  }
  lb
}

//=============================================================================
// Schedule replay

/// Replay a schedule step by step under the same live-range accounting the
/// enumerator uses, producing (busy length, cost, peak, sum).
pub fn cmput_sched_cost(
  ddg: &DataDepGraph, mach_mdl: &MachineModel, opts: &SchedulerOptions,
  times: &TypedIxVec<InstIx, InstCount>, sched_lwr_bound: InstCount,
) -> (InstCount, InstCount, InstCount, InstCount) {
  let func = opts.spill_cost_func;
  let n = ddg.inst_cnt();

  let mut t_last = 0;
  for ix in ddg.real_insts() {
    t_last = t_last.max(times[ix]);
  }
  let mut by_time: Vec<Option<InstIx>> = vec![None; t_last as usize + 1];
  for ix in ddg.real_insts() {
    debug_assert!(by_time[times[ix] as usize].is_none());
    by_time[times[ix] as usize] = Some(ix);
  }

  let reg_type_cnt = mach_mdl.reg_type_cnt();
  let mut live_wght = vec![0 as InstCount; reg_type_cnt];
  let mut live_cnt = vec![0 as InstCount; reg_type_cnt];
  let mut is_live = vec![false; ddg.reg_cnt() as usize];
  let mut use_done = vec![0 as InstCount; ddg.reg_cnt() as usize];
  for rix in ddg.regs_iter() {
    let reg = ddg.reg(rix);
    if reg.is_live_in {
      is_live[rix.get_usize()] = true;
      live_wght[reg.reg_type as usize] += reg.wght;
      live_cnt[reg.reg_type as usize] += 1;
    }
  }

  let excess = |live_wght: &[InstCount], live_cnt: &[InstCount]| {
    let mut wght = 0;
    let mut cnt = 0;
    for t in 0..reg_type_cnt {
      let limit = mach_mdl.phys_reg_cnt(t as u16);
      wght += (live_wght[t] - limit).max(0);
      cnt += (live_cnt[t] - limit).max(0);
    }
    (wght, cnt)
  };

  // Time 0 accounts for the live-in pressure, like the enumeration root.
  let (w0, c0) = excess(&live_wght, &live_cnt);
  let mut peak = spill_quantity(func, w0, c0);
  let mut sum = peak;

  for t in 1..=t_last {
    if let Some(ix) = by_time[t as usize] {
      for d in ddg.inst(ix).defs.iter() {
        if !is_live[d.get_usize()] {
          let reg = ddg.reg(*d);
          is_live[d.get_usize()] = true;
          live_wght[reg.reg_type as usize] += reg.wght;
          live_cnt[reg.reg_type as usize] += 1;
        }
      }
      for u in ddg.inst(ix).uses.iter() {
        use_done[u.get_usize()] += 1;
      }
    }
    let (w, c) = excess(&live_wght, &live_cnt);
    let v = spill_quantity(func, w, c);
    peak = peak.max(v);
    sum += v;
    if let Some(ix) = by_time[t as usize] {
      for u in ddg.inst(ix).uses.iter() {
        let reg = ddg.reg(*u);
        if is_live[u.get_usize()]
          && !reg.is_live_out
          && use_done[u.get_usize()] == reg.uses.len() as InstCount
        {
          is_live[u.get_usize()] = false;
          live_wght[reg.reg_type as usize] -= reg.wght;
          live_cnt[reg.reg_type as usize] -= 1;
        }
      }
    }
  }

  let lngth = sched_lngth(ddg, mach_mdl, times);
  let spill = aggrgt_spill(func, peak, sum, n);
  let cost = cmput_cost(lngth, sched_lwr_bound, spill, opts.spill_cost_factor);
  (lngth, cost, peak, sum)
}

//=============================================================================
// Schedule verification

/// Recheck a complete schedule against the machine constraints.  Used as a
/// defensive gate before handing a schedule back.
pub fn verify_sched(
  ddg: &DataDepGraph, mach_mdl: &MachineModel, sched: &Schedule,
) -> bool {
  let issue_rate = mach_mdl.issue_rate();

  let mut seen = std::collections::BTreeSet::new();
  for ix in ddg.real_insts() {
    let t = sched.times[ix];
    if t < 1 || !seen.insert(t) {
      return false;
    }
  }

  for ix in ddg.real_insts() {
    let cy = cycle_of(sched.times[ix], issue_rate);
    let inst = ddg.inst(ix);
    // Latencies.
    for e in inst.prdcsrs.iter() {
      if !ddg.is_real(e.other) {
        continue;
      }
      if cycle_of(sched.times[e.other], issue_rate) + e.ltncy > cy {
        return false;
      }
    }
  }

  // Slot usage, cycle blocking and reservations, cycle by cycle.
  let lngth = sched.lngth;
  let mut per_cycle: Vec<Vec<InstIx>> = vec![Vec::new(); lngth as usize];
  for ix in ddg.real_insts() {
    let cy = cycle_of(sched.times[ix], issue_rate) as usize;
    if cy >= per_cycle.len() {
      return false;
    }
    per_cycle[cy].push(ix);
  }
  for (cy, insts) in per_cycle.iter().enumerate() {
    let mut per_type = vec![0 as InstCount; mach_mdl.issue_type_cnt()];
    for ix in insts.iter() {
      let inst = ddg.inst(*ix);
      per_type[inst.issu_type as usize] += 1;
      if per_type[inst.issu_type as usize]
        > mach_mdl.slots_per_cycle(inst.issu_type)
      {
        return false;
      }
      if mach_mdl.blocks_cycle(inst.inst_type) && insts.len() > 1 {
        return false;
      }
      if !mach_mdl.is_pipelined(inst.inst_type) {
        // No instruction may land on this slot while the reservation is
        // active.
        let sl = (sched.times[*ix] - 1) % issue_rate;
        let ltncy = mach_mdl.latency(inst.inst_type, DepKind::Data);
        for othr in ddg.real_insts() {
          if othr == *ix {
            continue;
          }
          let ot = sched.times[othr];
          let ocy = cycle_of(ot, issue_rate);
          if (ot - 1) % issue_rate == sl
            && ocy > cy as InstCount
            && ocy < cy as InstCount + ltncy
          {
            return false;
          }
        }
      }
    }
  }

  true
}

//=============================================================================
// The region driver

fn mk_deadline(ms: u64, per_inst: bool, n: InstCount) -> Option<Duration> {
  if ms == 0 {
    None
  } else if per_inst {
    Some(Duration::from_millis(ms * n as u64))
  } else {
    Some(Duration::from_millis(ms))
  }
}

/// Schedule one region.  The caller may hand in the heuristic schedule; if
/// it does not, the internal list scheduler produces the upper bound.  A
/// timeout returns the incumbent with `is_optml == false`; regions outside
/// the configured size window return the heuristic schedule unchanged.
pub fn schedule_region(
  ddg: &mut DataDepGraph, mach_mdl: &MachineModel, opts: &SchedulerOptions,
  initial_sched: Option<Schedule>,
) -> Result<Schedule, SchedError> {
  let n = ddg.inst_cnt();
  info!("scheduling region of {} instructions", n);

  if opts.fix_live_in {
    let added = graph_trans::fix_live_in(ddg)?;
    debug!("fix-live-in added {} edges", added);
  }
  if opts.fix_live_out {
    let added = graph_trans::fix_live_out(ddg)?;
    debug!("fix-live-out added {} edges", added);
  }
  for trans in opts.graph_trans.iter() {
    let added = graph_trans::apply_graph_trans(*trans, ddg)?;
    debug!("{:?} added {} edges", trans, added);
  }

  let sched_lwr_bound =
    cmput_sched_lwr_bound(ddg, mach_mdl, opts.lower_bound_alg);

  // The upper bound: the caller's schedule, or our own list schedule, with
  // its cost recomputed under the canonical accounting.
  let hurstc_times = match initial_sched {
    Some(s) => s.times,
    None => schdul_hurstc(ddg, mach_mdl, &opts.hurstc_prirts),
  };
  let (h_lngth, h_cost, h_peak, h_sum) =
    cmput_sched_cost(ddg, mach_mdl, opts, &hurstc_times, sched_lwr_bound);
  let hurstc = Schedule {
    times: hurstc_times,
    lngth: h_lngth,
    cost: h_cost,
    peak_spill_cost: h_peak,
    spill_cost_sum: h_sum,
    is_optml: false,
  };
  info!(
    "heuristic schedule: length {} cost {} (length lower bound {})",
    h_lngth, h_cost, sched_lwr_bound
  );

  // Size and spill-cost gates: outside them the heuristic result stands.
  if n < opts.min_dag_size || n > opts.max_dag_size {
    debug!("region size {} outside [{}, {}]; keeping heuristic schedule",
           n, opts.min_dag_size, opts.max_dag_size);
    return Ok(hurstc);
  }
  let h_spill =
    aggrgt_spill(opts.spill_cost_func, h_peak, h_sum, n);
  if opts.max_spill_cost > 0 && h_spill > opts.max_spill_cost {
    debug!("heuristic spill cost {} exceeds limit {}; keeping heuristic \
            schedule", h_spill, opts.max_spill_cost);
    return Ok(hurstc);
  }

  if h_cost == 0 {
    info!("heuristic schedule is optimal");
    let mut best = hurstc;
    best.is_optml = true;
    return Ok(best);
  }

  let strt = Instant::now();
  let region_deadline = mk_deadline(opts.region_timeout_ms,
                                    opts.timeout_per_inst, n)
    .map(|d| strt + d);
  let lngth_budget = mk_deadline(opts.lngth_timeout_ms,
                                 opts.timeout_per_inst, n);

  let mut incumbent = hurstc.clone();
  let mut timed_out = false;
  let mut trgt_lngth = sched_lwr_bound;
  while trgt_lngth <= incumbent.lngth {
    let lngth_deadline = match (region_deadline, lngth_budget) {
      (None, None) => None,
      (Some(r), None) => Some(r),
      (None, Some(l)) => Some(Instant::now() + l),
      (Some(r), Some(l)) => Some(r.min(Instant::now() + l)),
    };

    let mut enumrtr = Enumerator::new(
      ddg,
      mach_mdl,
      opts,
      trgt_lngth,
      sched_lwr_bound,
      incumbent.cost,
      incumbent.lngth,
    );
    let res = enumrtr.enumerate(lngth_deadline)?;
    let stats = enumrtr.stats();
    info!(
      "target length {}: {} nodes, {} matches ({} subset), {} hist prunes, \
       {} absolute, {} cost prunes, {} infeasible, {} schedules",
      trgt_lngth,
      stats.nodes_crtd,
      stats.hist_matches,
      stats.hist.subset_matches,
      stats.hist_prunes,
      stats.hist.abslut_dmnnt_hits,
      stats.cost_prunes,
      stats.lngth_infsbl_prunes,
      stats.feasible_scheds
    );

    if let Some(best) = res.best {
      incumbent = best;
    }
    if res.timed_out {
      timed_out = true;
      break;
    }
    if incumbent.cost == 0 {
      break;
    }
    if let Some(r) = region_deadline {
      if Instant::now() >= r {
        timed_out = true;
        break;
      }
    }
    trgt_lngth += 1;
  }

  incumbent.is_optml = !timed_out;
  if timed_out {
    info!("timed out; returning incumbent of cost {}", incumbent.cost);
  }

  if !verify_sched(ddg, mach_mdl, &incumbent) {
    debug_assert!(false, "scheduler produced an invalid ordering");
    warn!("schedule failed verification; falling back to the heuristic");
    return Ok(hurstc);
  }
  Ok(incumbent)
}
