//! Pre-sized scratch memory for the suppression pass.
//!
//! All scratch is sized up front from the configuration and batch bound;
//! nothing grows during the run. The workspace is split into disjoint
//! per-image lanes so independent images can be processed in parallel, and
//! independent batches may run concurrently on independent workspaces.

use std::mem::size_of;

use crate::bbox::CornerBox;
use crate::candidate::Candidate;
use crate::config::NmsConfig;
use crate::util::{NmsError, NmsResult};

/// Scratch layout derived from the configuration and batch bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub max_batch: usize,
    pub num_priors: usize,
    pub num_classes: usize,
    pub top_k: usize,
    pub keep_top_k: usize,
    pub share_location: bool,
}

impl WorkspaceLayout {
    /// Derives the layout from a configured `NmsConfig`.
    pub fn from_config(config: &NmsConfig, max_batch: usize) -> NmsResult<Self> {
        if !config.is_configured() {
            return Err(NmsError::NotConfigured(
                "workspace layout needs the derived input shapes",
            ));
        }
        if max_batch == 0 {
            return Err(NmsError::InvalidDimensions {
                context: "max_batch",
                dims: vec![0],
            });
        }
        Ok(Self {
            max_batch,
            num_priors: config.num_priors,
            num_classes: config.params.num_classes,
            top_k: config.params.top_k,
            keep_top_k: config.params.keep_top_k,
            share_location: config.params.share_location,
        })
    }

    /// Candidate slots reserved per class: `top_k`, capped by the prior count.
    pub fn slots_per_class(&self) -> usize {
        self.top_k.min(self.num_priors)
    }

    fn slots_per_image(&self) -> usize {
        self.num_classes * self.slots_per_class()
    }

    /// Total scratch bytes for `max_batch` images.
    pub fn byte_size(&self) -> usize {
        let per_image = self.slots_per_image() * size_of::<Candidate>()
            + self.slots_per_image() * size_of::<CornerBox>()
            + self.num_classes * size_of::<u32>()
            + self.slots_per_image() * size_of::<u32>();
        self.max_batch * per_image
    }
}

/// Scratch byte count for a batched NMS pass.
///
/// Pure function of the configuration scalars; callable without running the
/// algorithm. `keep_top_k` and `share_location` take part in the layout
/// identity the run path checks the workspace against.
pub fn workspace_size(
    max_batch: usize,
    num_priors: usize,
    num_classes: usize,
    top_k: usize,
    keep_top_k: usize,
    share_location: bool,
) -> usize {
    WorkspaceLayout {
        max_batch,
        num_priors,
        num_classes,
        top_k,
        keep_top_k,
        share_location,
    }
    .byte_size()
}

/// Caller-owned scratch buffer, allocated once and reused across runs.
pub struct NmsWorkspace {
    layout: WorkspaceLayout,
    entries: Vec<Candidate>,
    boxes: Vec<CornerBox>,
    counts: Vec<u32>,
    merge: Vec<u32>,
}

impl NmsWorkspace {
    /// Allocates scratch for the given layout.
    pub fn new(layout: WorkspaceLayout) -> Self {
        let slots = layout.max_batch * layout.slots_per_image();
        Self {
            layout,
            entries: vec![Candidate::default(); slots],
            boxes: vec![CornerBox::default(); slots],
            counts: vec![0; layout.max_batch * layout.num_classes],
            merge: vec![0; slots],
        }
    }

    /// Allocates scratch sized for `config` and up to `max_batch` images.
    pub fn for_config(config: &NmsConfig, max_batch: usize) -> NmsResult<Self> {
        Ok(Self::new(WorkspaceLayout::from_config(config, max_batch)?))
    }

    /// The layout this workspace was allocated for.
    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Scratch bytes held, matching [`workspace_size`] for the same layout.
    pub fn byte_size(&self) -> usize {
        self.layout.byte_size()
    }

    /// Checks that this workspace fits a run of `batch` images under `config`.
    pub(crate) fn check_run(&self, config: &NmsConfig, batch: usize) -> NmsResult<()> {
        let needed = WorkspaceLayout::from_config(config, self.layout.max_batch)?;
        if needed != self.layout {
            return Err(NmsError::WorkspaceMismatch {
                needed: needed.byte_size(),
                got: self.byte_size(),
            });
        }
        if batch > self.layout.max_batch {
            return Err(NmsError::BatchTooLarge {
                got: batch,
                max: self.layout.max_batch,
            });
        }
        Ok(())
    }

    /// Splits the scratch into disjoint per-image lanes for the first
    /// `batch` images.
    pub(crate) fn image_lanes(&mut self, batch: usize) -> Vec<ImageLane<'_>> {
        let slots = self.layout.slots_per_image();
        let classes = self.layout.num_classes;
        self.entries
            .chunks_mut(slots)
            .zip(self.boxes.chunks_mut(slots))
            .zip(self.counts.chunks_mut(classes))
            .zip(self.merge.chunks_mut(slots))
            .take(batch)
            .map(|(((entries, boxes), counts), merge)| ImageLane {
                entries,
                boxes,
                counts,
                merge,
            })
            .collect()
    }
}

/// One image's slice of the workspace.
pub(crate) struct ImageLane<'a> {
    /// Per-class candidate slots, `slots_per_class` entries per class.
    pub entries: &'a mut [Candidate],
    /// Decoded (and clipped) box per candidate slot.
    pub boxes: &'a mut [CornerBox],
    /// Kept-candidate count per class.
    pub counts: &'a mut [u32],
    /// Merge pool of flat candidate indices.
    pub merge: &'a mut [u32],
}
