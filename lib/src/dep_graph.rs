/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! The data-dependence graph: instructions as nodes, typed latency-weighted
//! edges, recursive-neighbor bit vectors, per-instruction static cycle
//! bounds, and register def/use wiring.
//!
//! Instructions are numbered densely in [0, N).  Two synthetic boundary
//! instructions live at N (entry) and N+1 (exit); they are connected to all
//! otherwise-rootless/leafless instructions with 0-latency OTHER edges and
//! are slot-transparent: they never occupy an issue slot.

use crate::data_structures::{
  mkInstIx, mkRegIx, BitVec, InstCount, InstIx, InstType, IssueType, RegIx,
  RegType, TypedIxVec,
};
use crate::interface::SchedError;
use crate::machine_model::{DepKind, MachineModel};
use log::debug;
use smallvec::SmallVec;

//=============================================================================
// Latency precision

/// How edge latencies are derived.  `Precise` asks the machine model for the
/// latency of (source instruction type, dependence kind); `Rough` trusts the
/// per-edge latency supplied by the DAG adapter; `None` forces unit latency.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LatencyPrecision {
  Precise,
  Rough,
  None,
}

impl LatencyPrecision {
  pub fn from_name(name: &str) -> Result<LatencyPrecision, SchedError> {
    match name {
      "precise" => Ok(LatencyPrecision::Precise),
      "rough" => Ok(LatencyPrecision::Rough),
      "none" => Ok(LatencyPrecision::None),
      _ => Err(SchedError::InvalidConfig(format!(
        "unknown latency precision '{}'",
        name
      ))),
    }
  }
}

//=============================================================================
// Edges, registers, instructions

#[derive(Copy, Clone, Debug)]
pub struct DepEdge {
  pub other: InstIx,
  pub ltncy: InstCount,
  pub kind: DepKind,
}

/// A register, identified by (type, index-within-type).  Defs and uses list
/// real instructions only; liveness across the region boundary is carried by
/// the two flags.
#[derive(Clone, Debug)]
pub struct Register {
  pub reg_type: RegType,
  pub wght: InstCount,
  pub is_live_in: bool,
  pub is_live_out: bool,
  pub defs: SmallVec<[InstIx; 2]>,
  pub uses: SmallVec<[InstIx; 4]>,
}

pub struct SchedInstruction {
  pub name: String,
  pub inst_type: InstType,
  pub issu_type: IssueType,
  pub prdcsrs: SmallVec<[DepEdge; 4]>,
  pub scsrs: SmallVec<[DepEdge; 4]>,
  /// Transitive closure of the direct predecessor/successor relation, over
  /// all instructions including the boundaries.
  pub rcrsv_prdcsrs: BitVec,
  pub rcrsv_scsrs: BitVec,
  /// Static critical-path distances: earliest issue cycle counted from the
  /// region entry, and minimum number of cycles that must follow this
  /// instruction's issue cycle before the exit.
  pub frwrd_lwr_bound: InstCount,
  pub bkwrd_lwr_bound: InstCount,
  pub defs: SmallVec<[RegIx; 2]>,
  pub uses: SmallVec<[RegIx; 4]>,
  /// Position of this instruction in the source compiler's original order.
  pub input_order: InstCount,
}

//=============================================================================
// The graph itself

pub struct DataDepGraph {
  insts: TypedIxVec<InstIx, SchedInstruction>,
  regs: TypedIxVec<RegIx, Register>,
  inst_cnt: InstCount,
  root: InstIx,
  leaf: InstIx,
  max_ltncy: InstCount,
  sched_lwr_bound: InstCount,
  ltncy_prcsn: LatencyPrecision,
}

impl DataDepGraph {
  /// Number of real (schedulable) instructions, N.
  pub fn inst_cnt(&self) -> InstCount {
    self.inst_cnt
  }

  /// N plus the two boundary instructions.
  pub fn tot_inst_cnt(&self) -> InstCount {
    self.inst_cnt + 2
  }

  pub fn root(&self) -> InstIx {
    self.root
  }

  pub fn leaf(&self) -> InstIx {
    self.leaf
  }

  pub fn is_real(&self, ix: InstIx) -> bool {
    (ix.get() as InstCount) < self.inst_cnt
  }

  pub fn inst(&self, ix: InstIx) -> &SchedInstruction {
    &self.insts[ix]
  }

  pub fn real_insts(&self) -> impl Iterator<Item = InstIx> {
    (0..self.inst_cnt as u32).map(mkInstIx)
  }

  pub fn reg_cnt(&self) -> u32 {
    self.regs.len()
  }

  pub fn reg(&self, ix: RegIx) -> &Register {
    &self.regs[ix]
  }

  pub fn regs_iter(&self) -> impl Iterator<Item = RegIx> {
    (0..self.regs.len()).map(mkRegIx)
  }

  pub fn max_ltncy(&self) -> InstCount {
    self.max_ltncy
  }

  /// Critical-path lower bound on the schedule length, in cycles.
  pub fn sched_lwr_bound(&self) -> InstCount {
    self.sched_lwr_bound
  }

  pub fn ltncy_prcsn(&self) -> LatencyPrecision {
    self.ltncy_prcsn
  }

  pub fn is_rcrsv_scsr(&self, of: InstIx, cand: InstIx) -> bool {
    self.insts[of].rcrsv_scsrs.get(cand)
  }

  pub fn is_rcrsv_prdcsr(&self, of: InstIx, cand: InstIx) -> bool {
    self.insts[of].rcrsv_prdcsrs.get(cand)
  }

  /// True if neither instruction can reach the other.
  pub fn are_indep(&self, a: InstIx, b: InstIx) -> bool {
    !self.is_rcrsv_scsr(a, b) && !self.is_rcrsv_prdcsr(a, b)
  }

  /// Add an edge.  Callers adding edges (graph transformations, the
  /// live-in/live-out fix-up passes) must call `updt_graph_info` once the
  /// batch is complete.
  pub fn create_edge(
    &mut self, from: InstIx, to: InstIx, ltncy: InstCount, kind: DepKind,
  ) {
    debug_assert!(from != to);
    self.insts[from].scsrs.push(DepEdge { other: to, ltncy, kind });
    self.insts[to].prdcsrs.push(DepEdge { other: from, ltncy, kind });
  }

  /// Recompute the topological order, the recursive-neighbor closure, the
  /// static bounds and the maximum latency.  Fails if the edge relation has
  /// become cyclic.
  pub fn updt_graph_info(&mut self) -> Result<(), SchedError> {
    let order = self.topological_order()?;
    self.cmput_rcrsv_nghbrs(&order);
    self.cmput_crtcl_paths(&order);
    self.max_ltncy = self
      .insts
      .iter()
      .flat_map(|i| i.scsrs.iter())
      .map(|e| e.ltncy)
      .max()
      .unwrap_or(0)
      .max(1);
    Ok(())
  }

  /// Kahn's algorithm over all instructions including boundaries.
  fn topological_order(&self) -> Result<Vec<InstIx>, SchedError> {
    let tot = self.tot_inst_cnt() as usize;
    let mut in_degree = vec![0usize; tot];
    for i in 0..tot as u32 {
      in_degree[i as usize] = self.insts[mkInstIx(i)].prdcsrs.len();
    }
    let mut work: Vec<InstIx> = (0..tot as u32)
      .map(mkInstIx)
      .filter(|ix| in_degree[ix.get_usize()] == 0)
      .collect();
    if work.len() != 1 || work[0] != self.root {
      return Err(SchedError::InvalidDag(
        "the entry boundary is not the unique source".to_string(),
      ));
    }
    let mut order = Vec::with_capacity(tot);
    while let Some(ix) = work.pop() {
      order.push(ix);
      for e in self.insts[ix].scsrs.iter() {
        in_degree[e.other.get_usize()] -= 1;
        if in_degree[e.other.get_usize()] == 0 {
          work.push(e.other);
        }
      }
    }
    if order.len() != tot {
      return Err(SchedError::InvalidDag(
        "dependence edges form a cycle".to_string(),
      ));
    }
    Ok(order)
  }

  fn cmput_rcrsv_nghbrs(&mut self, order: &[InstIx]) {
    let tot = self.tot_inst_cnt() as u32;
    // Successor closure: walk in reverse topological order.
    for ix in order.iter().rev() {
      let mut bv = BitVec::new(tot);
      for n in 0..self.insts[*ix].scsrs.len() {
        let s = self.insts[*ix].scsrs[n].other;
        bv.set(s);
        bv.union(&self.insts[s].rcrsv_scsrs);
      }
      self.insts[*ix].rcrsv_scsrs = bv;
    }
    // Predecessor closure: forward topological order.
    for ix in order.iter() {
      let mut bv = BitVec::new(tot);
      for n in 0..self.insts[*ix].prdcsrs.len() {
        let p = self.insts[*ix].prdcsrs[n].other;
        bv.set(p);
        bv.union(&self.insts[p].rcrsv_prdcsrs);
      }
      self.insts[*ix].rcrsv_prdcsrs = bv;
    }
  }

  fn cmput_crtcl_paths(&mut self, order: &[InstIx]) {
    // Forward bounds: longest latency path from the entry.
    for ix in order.iter() {
      let mut fb = 0;
      for n in 0..self.insts[*ix].prdcsrs.len() {
        let e = self.insts[*ix].prdcsrs[n];
        fb = fb.max(self.insts[e.other].frwrd_lwr_bound + e.ltncy);
      }
      self.insts[*ix].frwrd_lwr_bound = fb;
    }
    // Backward bounds: longest latency path to the exit.
    for ix in order.iter().rev() {
      let mut bb = 0;
      for n in 0..self.insts[*ix].scsrs.len() {
        let e = self.insts[*ix].scsrs[n];
        bb = bb.max(self.insts[e.other].bkwrd_lwr_bound + e.ltncy);
      }
      self.insts[*ix].bkwrd_lwr_bound = bb;
    }
    let mut lb = 1;
    for ix in self.real_insts() {
      let inst = &self.insts[ix];
      lb = lb.max(inst.frwrd_lwr_bound + inst.bkwrd_lwr_bound + 1);
    }
    self.sched_lwr_bound = lb;
  }
}

//=============================================================================
// Building a graph from the DAG adapter's raw material

pub struct DdgBuilder<'a> {
  mach_mdl: &'a MachineModel,
  ltncy_prcsn: LatencyPrecision,
  treat_order_deps_as_data: bool,
  max_dag_size_for_prcs_ltncy: InstCount,
  names: Vec<String>,
  inst_types: Vec<InstType>,
  edges: Vec<(InstIx, InstIx, InstCount, DepKind)>,
  regs: TypedIxVec<RegIx, Register>,
  defs: Vec<(InstIx, RegIx)>,
  uses: Vec<(InstIx, RegIx)>,
}

impl<'a> DdgBuilder<'a> {
  /// `max_dag_size_for_prcs_ltncy` of 0 means no size limit; otherwise a
  /// graph with more real instructions than the limit downgrades `Precise`
  /// to `Rough`.
  pub fn new(
    mach_mdl: &'a MachineModel, ltncy_prcsn: LatencyPrecision,
    treat_order_deps_as_data: bool, max_dag_size_for_prcs_ltncy: InstCount,
  ) -> Self {
    DdgBuilder {
      mach_mdl,
      ltncy_prcsn,
      treat_order_deps_as_data,
      max_dag_size_for_prcs_ltncy,
      names: Vec::new(),
      inst_types: Vec::new(),
      edges: Vec::new(),
      regs: TypedIxVec::new(),
      defs: Vec::new(),
      uses: Vec::new(),
    }
  }

  /// Add an instruction.  Unknown instruction-type names fall back to the
  /// model's "Default" type.
  pub fn add_inst(&mut self, name: &str, inst_type_name: &str) -> InstIx {
    let inst_type = match self.mach_mdl.inst_type_by_name(inst_type_name) {
      Some(it) => it,
      None => {
        debug!(
          "instruction type '{}' not in the machine model; using Default",
          inst_type_name
        );
        self.mach_mdl.default_inst_type()
      }
    };
    let ix = mkInstIx(self.names.len() as u32);
    self.names.push(name.to_string());
    self.inst_types.push(inst_type);
    ix
  }

  pub fn add_edge(
    &mut self, from: InstIx, to: InstIx, rough_ltncy: InstCount, kind: DepKind,
  ) {
    self.edges.push((from, to, rough_ltncy, kind));
  }

  pub fn add_reg(&mut self, reg_type: RegType, wght: InstCount) -> RegIx {
    let ix = mkRegIx(self.regs.len());
    self.regs.push(Register {
      reg_type,
      wght,
      is_live_in: false,
      is_live_out: false,
      defs: SmallVec::new(),
      uses: SmallVec::new(),
    });
    ix
  }

  pub fn add_def(&mut self, inst: InstIx, reg: RegIx) {
    self.defs.push((inst, reg));
  }

  pub fn add_use(&mut self, inst: InstIx, reg: RegIx) {
    self.uses.push((inst, reg));
  }

  pub fn set_live_in(&mut self, reg: RegIx) {
    self.regs[reg].is_live_in = true;
  }

  pub fn set_live_out(&mut self, reg: RegIx) {
    self.regs[reg].is_live_out = true;
  }

  pub fn finish(self) -> Result<DataDepGraph, SchedError> {
    let inst_cnt = self.names.len() as InstCount;
    if inst_cnt == 0 {
      return Err(SchedError::InvalidDag("no instructions".to_string()));
    }
    let tot = inst_cnt + 2;
    let root = mkInstIx(inst_cnt as u32);
    let leaf = mkInstIx(inst_cnt as u32 + 1);

    let mut prcsn = self.ltncy_prcsn;
    if prcsn == LatencyPrecision::Precise
      && self.max_dag_size_for_prcs_ltncy > 0
      && inst_cnt > self.max_dag_size_for_prcs_ltncy
    {
      debug!(
        "graph of {} instructions exceeds the precise-latency limit {}; \
         using rough latencies",
        inst_cnt, self.max_dag_size_for_prcs_ltncy
      );
      prcsn = LatencyPrecision::Rough;
    }

    let mut insts = TypedIxVec::<InstIx, SchedInstruction>::new();
    for (n, name) in self.names.iter().enumerate() {
      let inst_type = self.inst_types[n];
      insts.push(SchedInstruction {
        name: name.clone(),
        inst_type,
        issu_type: self.mach_mdl.issu_type_of(inst_type),
        prdcsrs: SmallVec::new(),
        scsrs: SmallVec::new(),
        rcrsv_prdcsrs: BitVec::new(tot as u32),
        rcrsv_scsrs: BitVec::new(tot as u32),
        frwrd_lwr_bound: 0,
        bkwrd_lwr_bound: 0,
        defs: SmallVec::new(),
        uses: SmallVec::new(),
        input_order: n as InstCount,
      });
    }
    for (which, name) in [(root, "entry"), (leaf, "exit")].iter() {
      let inst_type = self.mach_mdl.default_inst_type();
      insts.push(SchedInstruction {
        name: name.to_string(),
        inst_type,
        issu_type: self.mach_mdl.issu_type_of(inst_type),
        prdcsrs: SmallVec::new(),
        scsrs: SmallVec::new(),
        rcrsv_prdcsrs: BitVec::new(tot as u32),
        rcrsv_scsrs: BitVec::new(tot as u32),
        frwrd_lwr_bound: 0,
        bkwrd_lwr_bound: 0,
        defs: SmallVec::new(),
        uses: SmallVec::new(),
        input_order: which.get() as InstCount,
      });
    }

    let mut ddg = DataDepGraph {
      insts,
      regs: self.regs,
      inst_cnt,
      root,
      leaf,
      max_ltncy: 1,
      sched_lwr_bound: 1,
      ltncy_prcsn: prcsn,
    };

    for (from, to, rough_ltncy, kind) in self.edges.iter() {
      if from == to
        || !ddg.is_real(*from)
        || !ddg.is_real(*to)
        || *rough_ltncy < 0
      {
        return Err(SchedError::InvalidDag(format!(
          "bad edge {:?} -> {:?}",
          from, to
        )));
      }
      let kind = if *kind == DepKind::Other && self.treat_order_deps_as_data {
        DepKind::Data
      } else {
        *kind
      };
      let ltncy = match prcsn {
        LatencyPrecision::Precise => {
          ddg.mach_latency(self.mach_mdl, *from, kind)
        }
        LatencyPrecision::Rough => *rough_ltncy,
        LatencyPrecision::None => 1,
      };
      ddg.create_edge(*from, *to, ltncy, kind);
    }

    // Connect the boundaries to all otherwise-rootless/leafless nodes.
    for n in 0..inst_cnt as u32 {
      let ix = mkInstIx(n);
      if ddg.insts[ix].prdcsrs.is_empty() {
        ddg.create_edge(root, ix, 0, DepKind::Other);
      }
      if ddg.insts[ix].scsrs.is_empty() {
        ddg.create_edge(ix, leaf, 0, DepKind::Other);
      }
    }

    // Wire registers: live-ins are defined by the entry, live-outs are used
    // by the exit.
    for (inst, reg) in self.defs.iter() {
      if !ddg.is_real(*inst) {
        return Err(SchedError::InvalidDag("def on a boundary".to_string()));
      }
      ddg.insts[*inst].defs.push(*reg);
      ddg.regs[*reg].defs.push(*inst);
    }
    for (inst, reg) in self.uses.iter() {
      if !ddg.is_real(*inst) {
        return Err(SchedError::InvalidDag("use on a boundary".to_string()));
      }
      ddg.insts[*inst].uses.push(*reg);
      ddg.regs[*reg].uses.push(*inst);
    }
    for rix in 0..ddg.regs.len() {
      let rix = mkRegIx(rix);
      if ddg.regs[rix].is_live_in {
        ddg.insts[root].defs.push(rix);
      }
      if ddg.regs[rix].is_live_out {
        ddg.insts[leaf].uses.push(rix);
      }
    }

    ddg.updt_graph_info()?;
    Ok(ddg)
  }
}

impl DataDepGraph {
  fn mach_latency(
    &self, mach_mdl: &MachineModel, from: InstIx, kind: DepKind,
  ) -> InstCount {
    mach_mdl.latency(self.insts[from].inst_type, kind)
  }
}

//=============================================================================

#[cfg(test)]
mod test {
  use super::*;
  use crate::machine_model::{InstTypeInfo, IssueTypeInfo, RegTypeInfo};

  fn model() -> MachineModel {
    MachineModel::new(
      "test",
      1,
      vec![IssueTypeInfo { name: "all".to_string(), slots_per_cycle: 1 }],
      vec![RegTypeInfo { name: "GPR".to_string(), phys_reg_cnt: 2 }],
      vec![InstTypeInfo {
        name: "load".to_string(),
        issu_type: 0,
        ltncy: 4,
        pipelined: true,
        blks_cycle: false,
      }],
    )
    .unwrap()
  }

  #[test]
  fn test_chain_bounds() {
    let mm = model();
    let mut b = DdgBuilder::new(&mm, LatencyPrecision::Rough, false, 0);
    let i0 = b.add_inst("a", "Default");
    let i1 = b.add_inst("b", "Default");
    let i2 = b.add_inst("c", "Default");
    b.add_edge(i0, i1, 3, DepKind::Data);
    b.add_edge(i1, i2, 1, DepKind::Data);
    let ddg = b.finish().unwrap();

    assert_eq!(ddg.inst_cnt(), 3);
    assert_eq!(ddg.inst(i0).frwrd_lwr_bound, 0);
    assert_eq!(ddg.inst(i1).frwrd_lwr_bound, 3);
    assert_eq!(ddg.inst(i2).frwrd_lwr_bound, 4);
    assert_eq!(ddg.inst(i0).bkwrd_lwr_bound, 4);
    assert_eq!(ddg.inst(i2).bkwrd_lwr_bound, 0);
    assert_eq!(ddg.sched_lwr_bound(), 5);
    assert_eq!(ddg.max_ltncy(), 3);
  }

  #[test]
  fn test_recursive_closure() {
    let mm = model();
    let mut b = DdgBuilder::new(&mm, LatencyPrecision::Rough, false, 0);
    let i0 = b.add_inst("a", "Default");
    let i1 = b.add_inst("b", "Default");
    let i2 = b.add_inst("c", "Default");
    let i3 = b.add_inst("d", "Default");
    b.add_edge(i0, i1, 1, DepKind::Data);
    b.add_edge(i1, i3, 1, DepKind::Data);
    b.add_edge(i0, i2, 1, DepKind::Data);
    let ddg = b.finish().unwrap();

    assert!(ddg.is_rcrsv_scsr(i0, i3));
    assert!(ddg.is_rcrsv_prdcsr(i3, i0));
    assert!(!ddg.is_rcrsv_scsr(i2, i3));
    assert!(ddg.are_indep(i2, i3));
    assert!(ddg.is_rcrsv_scsr(i0, ddg.leaf()));
    assert!(ddg.is_rcrsv_prdcsr(i0, ddg.root()));
  }

  #[test]
  fn test_cycle_rejected() {
    let mm = model();
    let mut b = DdgBuilder::new(&mm, LatencyPrecision::Rough, false, 0);
    let i0 = b.add_inst("a", "Default");
    let i1 = b.add_inst("b", "Default");
    b.add_edge(i0, i1, 1, DepKind::Data);
    b.add_edge(i1, i0, 1, DepKind::Data);
    match b.finish() {
      Err(SchedError::InvalidDag(_)) => {}
      other => panic!("expected InvalidDag, got {:?}", other.map(|_| ())),
    }
  }

  #[test]
  fn test_precise_latency_and_downgrade() {
    let mm = model();
    // Precise: the edge latency comes from the source's instruction type.
    let mut b = DdgBuilder::new(&mm, LatencyPrecision::Precise, false, 0);
    let i0 = b.add_inst("a", "load");
    let i1 = b.add_inst("b", "Default");
    b.add_edge(i0, i1, 1, DepKind::Data);
    let ddg = b.finish().unwrap();
    assert_eq!(ddg.inst(i0).scsrs[0].ltncy, 4);

    // A graph larger than the precise-latency limit downgrades to rough.
    let mut b = DdgBuilder::new(&mm, LatencyPrecision::Precise, false, 1);
    let i0 = b.add_inst("a", "load");
    let i1 = b.add_inst("b", "Default");
    b.add_edge(i0, i1, 2, DepKind::Data);
    let ddg = b.finish().unwrap();
    assert_eq!(ddg.ltncy_prcsn(), LatencyPrecision::Rough);
    assert_eq!(ddg.inst(i0).scsrs[0].ltncy, 2);
  }

  #[test]
  fn test_order_deps_as_data_deps() {
    let mm = model();
    let mut b = DdgBuilder::new(&mm, LatencyPrecision::Rough, true, 0);
    let i0 = b.add_inst("a", "Default");
    let i1 = b.add_inst("b", "Default");
    b.add_edge(i0, i1, 1, DepKind::Other);
    let ddg = b.finish().unwrap();
    assert_eq!(ddg.inst(i0).scsrs[0].kind, DepKind::Data);
  }

  #[test]
  fn test_live_in_out_wiring() {
    let mm = model();
    let mut b = DdgBuilder::new(&mm, LatencyPrecision::Rough, false, 0);
    let i0 = b.add_inst("a", "Default");
    let gpr = mm.reg_type_by_name("GPR").unwrap();
    let r_in = b.add_reg(gpr, 1);
    let r_out = b.add_reg(gpr, 1);
    b.set_live_in(r_in);
    b.add_use(i0, r_in);
    b.add_def(i0, r_out);
    b.set_live_out(r_out);
    let ddg = b.finish().unwrap();

    assert!(ddg.inst(ddg.root()).defs.contains(&r_in));
    assert!(ddg.inst(ddg.leaf()).uses.contains(&r_out));
    assert!(ddg.reg(r_in).is_live_in);
    assert!(ddg.reg(r_out).is_live_out);
    assert_eq!(ddg.reg(r_out).defs.as_slice(), &[i0]);
  }
}
