/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Shared scaffolding for the driver and its tests: compact DAG/model
//! builders, a brute-force reference scheduler, and a tiny deterministic
//! random-DAG generator.

use bbsched::{
  cycle_of, mkInstIx, DataDepGraph, DdgBuilder, DepKind, InstCount, InstIx,
  InstTypeInfo, IssueTypeInfo, LatencyPrecision, MachineModel, RegTypeInfo,
  TypedIxVec, INVALID_VALUE,
};

//=============================================================================
// Model and DAG builders

/// One issue type holding all slots, a single "GPR" register type, and a
/// palette of instruction types the cases pick from by name.
pub fn make_model(issue_rate: InstCount, gpr_limit: InstCount) -> MachineModel {
  let inst_types = vec![
    InstTypeInfo {
      name: "lat2".to_string(),
      issu_type: 0,
      ltncy: 2,
      pipelined: true,
      blks_cycle: false,
    },
    InstTypeInfo {
      name: "lat3".to_string(),
      issu_type: 0,
      ltncy: 3,
      pipelined: true,
      blks_cycle: false,
    },
    InstTypeInfo {
      name: "div2".to_string(),
      issu_type: 0,
      ltncy: 2,
      pipelined: false,
      blks_cycle: false,
    },
    InstTypeInfo {
      name: "barrier".to_string(),
      issu_type: 0,
      ltncy: 1,
      pipelined: true,
      blks_cycle: true,
    },
  ];
  MachineModel::new(
    "minisched",
    issue_rate,
    vec![IssueTypeInfo {
      name: "all".to_string(),
      slots_per_cycle: issue_rate,
    }],
    vec![RegTypeInfo { name: "GPR".to_string(), phys_reg_cnt: gpr_limit }],
    inst_types,
  )
  .expect("test machine model must be valid")
}

/// A register in a case description: the defining instruction (or a
/// live-in), its users, and whether it survives the region.
pub struct RegSpec {
  pub def: Option<usize>,
  pub uses: Vec<usize>,
  pub live_in: bool,
  pub live_out: bool,
}

/// Build a DAG from instruction types, latency-weighted data edges and
/// register wiring.  Instruction names are synthesized.
pub fn build_dag(
  mm: &MachineModel, inst_types: &[&str],
  edges: &[(usize, usize, InstCount)], regs: &[RegSpec],
) -> DataDepGraph {
  let mut b = DdgBuilder::new(mm, LatencyPrecision::Rough, false, 0);
  let mut ixs = Vec::new();
  for (n, ty) in inst_types.iter().enumerate() {
    ixs.push(b.add_inst(&format!("i{}", n), ty));
  }
  for (from, to, ltncy) in edges.iter() {
    b.add_edge(ixs[*from], ixs[*to], *ltncy, DepKind::Data);
  }
  let gpr = 0;
  for spec in regs.iter() {
    let r = b.add_reg(gpr, 1);
    if let Some(d) = spec.def {
      b.add_def(ixs[d], r);
    }
    if spec.live_in {
      b.set_live_in(r);
    }
    if spec.live_out {
      b.set_live_out(r);
    }
    for u in spec.uses.iter() {
      b.add_use(ixs[*u], r);
    }
  }
  b.finish().expect("test DAG must be valid")
}

//=============================================================================
// Brute-force reference

/// Place instructions greedily in a fixed issue order: each one goes to the
/// earliest slot satisfying latencies, slot limits, reservations, and cycle
/// blocking, never before its predecessor in the order.
fn place_in_order(
  mm: &MachineModel, ddg: &DataDepGraph, order: &[InstIx],
) -> TypedIxVec<InstIx, InstCount> {
  let issue_rate = mm.issue_rate();
  let n = ddg.inst_cnt();
  let mut times = TypedIxVec::<InstIx, InstCount>::new();
  times.resize(n as u32, INVALID_VALUE);

  let mut rsrv_until = vec![-1 as InstCount; issue_rate as usize];
  let mut rsrv_from = vec![InstCount::max_value(); issue_rate as usize];
  let mut per_cycle_type: Vec<Vec<InstCount>> = Vec::new();
  let mut cycle_has_inst: Vec<bool> = Vec::new();
  let mut cycle_blkd: Vec<bool> = Vec::new();
  let mut used_time: Vec<bool> = vec![false];

  let mut t_min = 1;
  for ix in order.iter() {
    let inst = ddg.inst(*ix);
    let mut erlst_cycle = 0;
    for e in inst.prdcsrs.iter() {
      if !ddg.is_real(e.other) {
        continue;
      }
      let pc = cycle_of(times[e.other], issue_rate);
      erlst_cycle = erlst_cycle.max(pc + e.ltncy);
    }
    let mut t = t_min.max(erlst_cycle * issue_rate + 1);
    loop {
      let cy = cycle_of(t, issue_rate);
      let sl = ((t - 1) % issue_rate) as usize;
      while per_cycle_type.len() <= cy as usize {
        per_cycle_type.push(vec![0; mm.issue_type_cnt()]);
        cycle_has_inst.push(false);
        cycle_blkd.push(false);
      }
      while used_time.len() <= t as usize {
        used_time.push(false);
      }
      let cyu = cy as usize;
      let fits = !used_time[t as usize]
        && cy >= erlst_cycle
        && !cycle_blkd[cyu]
        && !(cy >= rsrv_from[sl] && cy <= rsrv_until[sl])
        && per_cycle_type[cyu][inst.issu_type as usize]
          < mm.slots_per_cycle(inst.issu_type)
        && !(mm.blocks_cycle(inst.inst_type) && cycle_has_inst[cyu]);
      if fits {
        times[*ix] = t;
        used_time[t as usize] = true;
        per_cycle_type[cyu][inst.issu_type as usize] += 1;
        cycle_has_inst[cyu] = true;
        if mm.blocks_cycle(inst.inst_type) {
          cycle_blkd[cyu] = true;
        }
        if !mm.is_pipelined(inst.inst_type) {
          let ltncy = mm.latency(inst.inst_type, DepKind::Data);
          rsrv_from[sl] = cy;
          rsrv_until[sl] = cy + ltncy - 1;
        }
        t_min = t + 1;
        break;
      }
      t += 1;
    }
  }
  times
}

fn recurse_orders(
  mm: &MachineModel, ddg: &DataDepGraph, placed: &mut Vec<bool>,
  order: &mut Vec<InstIx>, best: &mut InstCount,
) {
  let n = ddg.inst_cnt() as usize;
  if order.len() == n {
    let times = place_in_order(mm, ddg, order);
    let lngth = bbsched::sched_lngth(ddg, mm, &times);
    if lngth < *best {
      *best = lngth;
    }
    return;
  }
  for c in 0..n {
    if placed[c] {
      continue;
    }
    let cand = mkInstIx(c as u32);
    let rdy = ddg
      .inst(cand)
      .prdcsrs
      .iter()
      .all(|e| !ddg.is_real(e.other) || placed[e.other.get_usize()]);
    if !rdy {
      continue;
    }
    placed[c] = true;
    order.push(cand);
    recurse_orders(mm, ddg, placed, order, best);
    order.pop();
    placed[c] = false;
  }
}

/// Exhaustively try every topological issue order and return the smallest
/// busy length any of them achieves under greedy placement.
pub fn brute_force_min_lngth(
  mm: &MachineModel, ddg: &DataDepGraph,
) -> InstCount {
  let n = ddg.inst_cnt() as usize;
  let mut placed: Vec<bool> = vec![false; n];
  let mut order: Vec<InstIx> = Vec::with_capacity(n);
  let mut best = InstCount::max_value();
  recurse_orders(mm, ddg, &mut placed, &mut order, &mut best);
  best
}

//=============================================================================
// Deterministic pseudo-random DAGs

/// A bare-bones linear congruential generator, good enough to vary test
/// DAG shapes reproducibly.
pub struct Lcg(u64);

impl Lcg {
  pub fn new(seed: u64) -> Lcg {
    Lcg(seed.wrapping_mul(2862933555777941757).wrapping_add(3037000493))
  }

  pub fn next_u32(&mut self) -> u32 {
    self.0 = self
      .0
      .wrapping_mul(6364136223846793005)
      .wrapping_add(1442695040888963407);
    (self.0 >> 33) as u32
  }

  pub fn below(&mut self, n: u32) -> u32 {
    self.next_u32() % n
  }
}

/// A random DAG of pipelined instructions with bounded latencies: each
/// ordered pair (i, j) gets a data edge with probability 1/3.
pub fn random_dag(
  mm: &MachineModel, lcg: &mut Lcg, n: usize, max_ltncy: InstCount,
) -> DataDepGraph {
  let types = vec!["Default"; n];
  let mut edges = Vec::new();
  for i in 0..n {
    for j in i + 1..n {
      if lcg.below(3) == 0 {
        let ltncy = 1 + lcg.below(max_ltncy as u32) as InstCount;
        edges.push((i, j, ltncy));
      }
    }
  }
  build_dag(mm, &types, &edges, &[])
}
