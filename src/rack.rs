use crate::config::TopologyConfig;
use crate::invariants::debug_assert_rack_count_sane;

/// Per-batch, per-timeslot admission bookkeeping owned exclusively by the
/// admission core.
///
/// Conceptually `B` parallel copies of `src_endnode_used[]`,
/// `dst_endnode_used[]`, `src_rack_count[]`, and `dst_rack_count[]`,
/// realized here as flat arrays indexed by `timeslot * width + id`, one
/// allocation reused across every batch a core drives.
pub struct BatchWindow {
    batch_size: usize,
    num_nodes: usize,
    num_racks: usize,
    src_used: Vec<bool>,
    dst_used: Vec<bool>,
    src_rack_count: Vec<u16>,
    dst_rack_count: Vec<u16>,
    /// Per-timeslot count of edges admitted toward `Node::OUT_OF_BOUNDARY`,
    /// capped by `out_of_boundary_capacity` independent of any rack's
    /// counter.
    out_of_boundary_count: Vec<u16>,
}

impl BatchWindow {
    pub fn new(cfg: &TopologyConfig) -> Self {
        let batch_size = cfg.batch_size() as usize;
        let num_nodes = cfg.num_nodes() as usize;
        let num_racks = cfg.num_racks() as usize;
        Self {
            batch_size,
            num_nodes,
            num_racks,
            src_used: vec![false; batch_size * num_nodes],
            dst_used: vec![false; batch_size * num_nodes],
            src_rack_count: vec![0; batch_size * num_racks],
            dst_rack_count: vec![0; batch_size * num_racks],
            out_of_boundary_count: vec![0; batch_size],
        }
    }

    /// Resets all per-timeslot state at the start of a new batch.
    pub fn reset(&mut self) {
        self.src_used.iter_mut().for_each(|b| *b = false);
        self.dst_used.iter_mut().for_each(|b| *b = false);
        self.src_rack_count.iter_mut().for_each(|c| *c = 0);
        self.dst_rack_count.iter_mut().for_each(|c| *c = 0);
        self.out_of_boundary_count.iter_mut().for_each(|c| *c = 0);
    }

    #[inline]
    pub fn is_src_used(&self, t: usize, src: u32) -> bool {
        self.src_used[t * self.num_nodes + src as usize]
    }

    #[inline]
    pub fn is_dst_used(&self, t: usize, dst: u32) -> bool {
        self.dst_used[t * self.num_nodes + dst as usize]
    }

    #[inline]
    pub fn src_rack_count(&self, t: usize, rack: u32) -> u16 {
        self.src_rack_count[t * self.num_racks + rack as usize]
    }

    #[inline]
    pub fn dst_rack_count(&self, t: usize, rack: u32) -> u16 {
        self.dst_rack_count[t * self.num_racks + rack as usize]
    }

    #[inline]
    pub fn out_of_boundary_count(&self, t: usize) -> u16 {
        self.out_of_boundary_count[t]
    }

    /// Records an admission at timeslot `t`: marks both endpoints used and
    /// bumps both racks' counters. `dst_rack` is
    /// `None` for `Node::OUT_OF_BOUNDARY`, which tracks its own counter
    /// instead of a rack's.
    pub fn mark_admitted(&mut self, t: usize, src: u32, dst: u32, src_rack: u32, dst_rack: Option<u32>) {
        self.src_used[t * self.num_nodes + src as usize] = true;
        if let Some(dst_rack) = dst_rack {
            self.dst_used[t * self.num_nodes + dst as usize] = true;
            let idx = t * self.num_racks + dst_rack as usize;
            self.dst_rack_count[idx] += 1;
            debug_assert_rack_count_sane!(self.dst_rack_count[idx], u16::MAX);
        } else {
            self.out_of_boundary_count[t] += 1;
        }

        let idx = t * self.num_racks + src_rack as usize;
        self.src_rack_count[idx] += 1;
        debug_assert_rack_count_sane!(self.src_rack_count[idx], u16::MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_all_state() {
        let cfg = TopologyConfig::default();
        let mut w = BatchWindow::new(&cfg);
        w.mark_admitted(0, 0, 1, 0, Some(0));
        assert!(w.is_src_used(0, 0));
        w.reset();
        assert!(!w.is_src_used(0, 0));
        assert_eq!(w.src_rack_count(0, 0), 0);
    }

    #[test]
    fn out_of_boundary_has_its_own_counter() {
        let cfg = TopologyConfig::default();
        let mut w = BatchWindow::new(&cfg);
        w.mark_admitted(0, 0, u32::MAX, 0, None);
        assert_eq!(w.out_of_boundary_count(0), 1);
        assert_eq!(w.dst_rack_count(0, 0), 0);
    }
}
