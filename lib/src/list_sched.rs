/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! The heuristic list scheduler.  A plain forward cycle-by-cycle scan under
//! the same machine constraints the enumerator enforces; its result seeds
//! the branch-and-bound upper bound.

use crate::data_structures::{InstCount, InstIx, TypedIxVec, INVALID_VALUE};
use crate::dep_graph::DataDepGraph;
use crate::hist_table::ReserveSlot;
use crate::machine_model::MachineModel;
use crate::ready_list::{KeyedPrirts, ReadyList, SchedPriorities};
use log::debug;

/// Schedule every real instruction, returning 1-based issue times on the
/// slot clock.  The instruction issued at time t occupies cycle (t-1)/R,
/// slot (t-1) mod R.
pub fn schdul_hurstc(
  ddg: &DataDepGraph, mach_mdl: &MachineModel, prirts: &SchedPriorities,
) -> TypedIxVec<InstIx, InstCount> {
  let n = ddg.inst_cnt();
  let issue_rate = mach_mdl.issue_rate();
  let keyed = KeyedPrirts::new(ddg, prirts);

  let mut times = TypedIxVec::<InstIx, InstCount>::new();
  times.resize(n as u32, INVALID_VALUE);

  // Predecessors still unscheduled, not counting the entry boundary.
  let mut prdcsr_wait = TypedIxVec::<InstIx, InstCount>::new();
  let mut erlst_cycle = TypedIxVec::<InstIx, InstCount>::new();
  for ix in ddg.real_insts() {
    let cnt = ddg
      .inst(ix)
      .prdcsrs
      .iter()
      .filter(|e| e.other != ddg.root())
      .count();
    prdcsr_wait.push(cnt as InstCount);
    erlst_cycle.push(ddg.inst(ix).frwrd_lwr_bound);
  }

  let mut rdy = ReadyList::new();
  for ix in ddg.real_insts() {
    if prdcsr_wait[ix] == 0 {
      rdy.add(&keyed, ix);
    }
  }

  let mut slot_cnts = vec![0 as InstCount; mach_mdl.issue_type_cnt()];
  let mut rsrv_slots = vec![ReserveSlot::free(); issue_rate as usize];
  let mut cycle_blkd = false;
  let mut issued_in_cycle = 0;
  let mut schduld_cnt = 0;
  let mut t: InstCount = 0;

  while schduld_cnt < n {
    t += 1;
    let cy = (t - 1) / issue_rate;
    let sl = ((t - 1) % issue_rate) as usize;
    if sl == 0 {
      for c in slot_cnts.iter_mut() {
        *c = 0;
      }
      cycle_blkd = false;
      issued_in_cycle = 0;
    }

    let rsrvd = rsrv_slots[sl].blocks(cy);

    let mut pick = None;
    if !cycle_blkd && !rsrvd {
      for cand in rdy.iter() {
        let inst = ddg.inst(*cand);
        if erlst_cycle[*cand] > cy {
          continue;
        }
        if slot_cnts[inst.issu_type as usize]
          >= mach_mdl.slots_per_cycle(inst.issu_type)
        {
          continue;
        }
        if mach_mdl.blocks_cycle(inst.inst_type) && issued_in_cycle > 0 {
          continue;
        }
        pick = Some(*cand);
        break;
      }
    }

    let inst_ix = match pick {
      None => continue, // stall
      Some(ix) => ix,
    };
    let inst = ddg.inst(inst_ix);
    times[inst_ix] = t;
    schduld_cnt += 1;
    issued_in_cycle += 1;
    slot_cnts[inst.issu_type as usize] += 1;
    if mach_mdl.blocks_cycle(inst.inst_type) {
      cycle_blkd = true;
    }
    if !mach_mdl.is_pipelined(inst.inst_type) {
      let ltncy = mach_mdl.latency(inst.inst_type, crate::DepKind::Data);
      rsrv_slots[sl] = ReserveSlot { strt_cycle: cy, end_cycle: cy + ltncy - 1 };
    }

    rdy.remove(inst_ix);
    for e in inst.scsrs.iter() {
      if !ddg.is_real(e.other) {
        continue;
      }
      prdcsr_wait[e.other] -= 1;
      if erlst_cycle[e.other] < cy + e.ltncy {
        erlst_cycle[e.other] = cy + e.ltncy;
      }
      if prdcsr_wait[e.other] == 0 {
        rdy.add(&keyed, e.other);
      }
    }
  }

  debug!("heuristic schedule finished at time {}", t);
  times
}

/// The busy length of a schedule in cycles: issue cycles plus the trailing
/// occupancy of unpipelined instructions.
pub fn sched_lngth(
  ddg: &DataDepGraph, mach_mdl: &MachineModel,
  times: &TypedIxVec<InstIx, InstCount>,
) -> InstCount {
  let issue_rate = mach_mdl.issue_rate();
  let mut lngth = 0;
  for ix in ddg.real_insts() {
    let cy = (times[ix] - 1) / issue_rate;
    let it = ddg.inst(ix).inst_type;
    let busy = if mach_mdl.is_pipelined(it) {
      1
    } else {
      mach_mdl.latency(it, crate::DepKind::Data)
    };
    lngth = lngth.max(cy + busy);
  }
  lngth
}

//=============================================================================

#[cfg(test)]
mod test {
  use super::*;
  use crate::dep_graph::{DdgBuilder, LatencyPrecision};
  use crate::machine_model::{
    DepKind, InstTypeInfo, IssueTypeInfo, MachineModel,
  };
  use crate::ready_list::PriorityKey;

  fn model(issue_rate: InstCount) -> MachineModel {
    MachineModel::new(
      "test",
      issue_rate,
      vec![IssueTypeInfo {
        name: "all".to_string(),
        slots_per_cycle: issue_rate,
      }],
      vec![],
      vec![InstTypeInfo {
        name: "div".to_string(),
        issu_type: 0,
        ltncy: 2,
        pipelined: false,
        blks_cycle: false,
      }],
    )
    .unwrap()
  }

  fn prirts() -> SchedPriorities {
    vec![PriorityKey::CrtclPath, PriorityKey::NodeNum]
  }

  #[test]
  fn test_latency_chain_stalls() {
    let mm = model(1);
    let mut b = DdgBuilder::new(&mm, LatencyPrecision::Rough, false, 0);
    let i0 = b.add_inst("a", "Default");
    let i1 = b.add_inst("b", "Default");
    b.add_edge(i0, i1, 3, DepKind::Data);
    let ddg = b.finish().unwrap();

    let times = schdul_hurstc(&ddg, &mm, &prirts());
    assert_eq!(times[i0], 1); // cycle 0
    assert_eq!(times[i1], 4); // cycle 3, after two stall cycles
    assert_eq!(sched_lngth(&ddg, &mm, &times), 4);
  }

  #[test]
  fn test_issue_rate_two_packs_a_cycle() {
    let mm = model(2);
    let mut b = DdgBuilder::new(&mm, LatencyPrecision::Rough, false, 0);
    let i0 = b.add_inst("a", "Default");
    let i1 = b.add_inst("b", "Default");
    let ddg = b.finish().unwrap();

    let times = schdul_hurstc(&ddg, &mm, &prirts());
    assert_eq!((times[i0] - 1) / 2, 0);
    assert_eq!((times[i1] - 1) / 2, 0);
    assert_eq!(sched_lngth(&ddg, &mm, &times), 1);
  }

  #[test]
  fn test_unpipelined_reservations() {
    let mm = model(1);
    let mut b = DdgBuilder::new(&mm, LatencyPrecision::Rough, false, 0);
    let i0 = b.add_inst("a", "div");
    let i1 = b.add_inst("b", "div");
    let i2 = b.add_inst("c", "div");
    let ddg = b.finish().unwrap();

    let times = schdul_hurstc(&ddg, &mm, &prirts());
    let mut cycles: Vec<InstCount> =
      vec![times[i0] - 1, times[i1] - 1, times[i2] - 1];
    cycles.sort_unstable();
    assert_eq!(cycles, vec![0, 2, 4]);
    // Busy through cycle 5.
    assert_eq!(sched_lngth(&ddg, &mm, &times), 6);
  }
}
