//! Time-indexed transform cache
//!
//! Every child frame has exactly one parent edge holding a bounded,
//! time-ordered history of parent-from-child transforms. Lookups walk both
//! frames up to their closest common ancestor and compose the edges on the way.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use log::{debug, warn};
use nalgebra::{Isometry3, Translation3};
use parking_lot::RwLock;

use super::{StampedTransform, TransformError, TransformLookup};
use crate::config::TransformConfig;

/// Samples kept per edge when nothing else is configured
pub const DEFAULT_HISTORY: usize = 100;

/// Tolerated distance between a request time and the buffered data (s)
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// Longest a lookup waits for a concurrent writer
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
struct Edge {
    parent: String,
    samples: VecDeque<(f64, Isometry3<f64>)>,
    is_static: bool,
}

impl Edge {
    /// Parent-from-child transform at `stamp`, interpolated between the
    /// bracketing samples. `None` picks the newest sample.
    fn sample(
        &self,
        child: &str,
        stamp: Option<f64>,
        tolerance: f64,
    ) -> Result<Isometry3<f64>, TransformError> {
        let (&(oldest, first), &(newest, last)) = self
            .samples
            .front()
            .zip(self.samples.back())
            .ok_or_else(|| TransformError::UnknownFrame(child.to_string()))?;

        if self.is_static {
            return Ok(last);
        }
        let Some(stamp) = stamp else {
            return Ok(last);
        };

        if !(oldest - tolerance..=newest + tolerance).contains(&stamp) {
            return Err(TransformError::Extrapolation {
                frame: child.to_string(),
                requested: stamp,
                oldest,
                newest,
            });
        }
        if stamp >= newest {
            return Ok(last);
        }
        if stamp <= oldest {
            return Ok(first);
        }

        let after = self.samples.partition_point(|&(time, _)| time <= stamp);
        let (t0, before_iso) = self.samples[after - 1];
        let (t1, after_iso) = self.samples[after];
        let ratio = (stamp - t0) / (t1 - t0);

        let translation = before_iso
            .translation
            .vector
            .lerp(&after_iso.translation.vector, ratio);
        let rotation = before_iso
            .rotation
            .try_slerp(&after_iso.rotation, ratio, 1.0e-9)
            .unwrap_or(if ratio < 0.5 {
                before_iso.rotation
            } else {
                after_iso.rotation
            });

        Ok(Isometry3::from_parts(Translation3::from(translation), rotation))
    }

    fn newest(&self) -> Option<f64> {
        self.samples.back().map(|&(time, _)| time)
    }
}

#[derive(Debug, Default)]
struct FrameTree {
    // keyed by child frame
    edges: HashMap<String, Edge>,
}

impl FrameTree {
    fn contains(&self, frame: &str) -> bool {
        self.edges.contains_key(frame) || self.edges.values().any(|edge| edge.parent == frame)
    }

    /// The frame followed by its ancestors up to the root.
    fn ancestors<'a>(&'a self, frame: &'a str) -> Vec<&'a str> {
        let mut chain = vec![frame];
        let mut current = frame;
        while let Some(edge) = self.edges.get(current) {
            // a loop in the tree would never reach a root
            if chain.len() > self.edges.len() {
                warn!("Transform tree contains a loop through '{}'", frame);
                break;
            }
            current = edge.parent.as_str();
            chain.push(current);
        }
        chain
    }

    /// Composes the edges of `chain` bottom-up into `ancestor_from_frame`.
    fn accumulate(
        &self,
        chain: &[&str],
        stamp: Option<f64>,
        tolerance: f64,
    ) -> Result<Isometry3<f64>, TransformError> {
        chain.iter().try_fold(Isometry3::identity(), |accumulated, child| {
            let edge = self
                .edges
                .get(*child)
                .ok_or_else(|| TransformError::UnknownFrame(child.to_string()))?;
            Ok(edge.sample(child, stamp, tolerance)? * accumulated)
        })
    }

    /// Newest time covered by every dynamic edge of `chain`, `None` when all
    /// of them are static.
    fn latest_common_time<'a, 'b: 'a>(&self, chain: impl Iterator<Item = &'a &'b str>) -> Option<f64> {
        chain
            .filter_map(|child| self.edges.get(*child))
            .filter(|edge| !edge.is_static)
            .filter_map(Edge::newest)
            .reduce(f64::min)
    }

    fn lookup(
        &self,
        target_frame: &str,
        source_frame: &str,
        stamp: Option<f64>,
        tolerance: f64,
    ) -> Result<StampedTransform, TransformError> {
        for frame in [target_frame, source_frame] {
            if !self.contains(frame) {
                return Err(TransformError::UnknownFrame(frame.to_string()));
            }
        }

        let source_chain = self.ancestors(source_frame);
        let target_chain = self.ancestors(target_frame);

        let (target_depth, source_depth) = target_chain
            .iter()
            .enumerate()
            .find_map(|(target_depth, frame)| {
                source_chain
                    .iter()
                    .position(|candidate| candidate == frame)
                    .map(|source_depth| (target_depth, source_depth))
            })
            .ok_or_else(|| TransformError::NoPath {
                source_frame: source_frame.to_string(),
                target_frame: target_frame.to_string(),
            })?;
        let source_chain = &source_chain[..source_depth];
        let target_chain = &target_chain[..target_depth];

        // every edge is sampled at the same instant
        let stamp = stamp
            .or_else(|| self.latest_common_time(source_chain.iter().chain(target_chain.iter())));

        let ancestor_from_source = self.accumulate(source_chain, stamp, tolerance)?;
        let ancestor_from_target = self.accumulate(target_chain, stamp, tolerance)?;

        Ok(StampedTransform::new(
            target_frame,
            source_frame,
            stamp.unwrap_or(0.0),
            ancestor_from_target.inverse() * ancestor_from_source,
        ))
    }
}

/// Concurrent transform cache.
///
/// Writers (a `/tf` ingestion thread) and the control cycle share the buffer
/// through `&self`; a whole edge is replaced or extended under the write
/// lock, so readers never observe a partially written transform.
#[derive(Debug)]
pub struct TransformBuffer {
    tree: RwLock<FrameTree>,
    tolerance: f64,
    lock_timeout: Duration,
    history: usize,
}

impl Default for TransformBuffer {
    fn default() -> Self {
        TransformBuffer::new(DEFAULT_TOLERANCE, DEFAULT_LOCK_TIMEOUT, DEFAULT_HISTORY)
    }
}

impl TransformBuffer {
    /// Creates an empty buffer
    pub fn new(tolerance: f64, lock_timeout: Duration, history: usize) -> Self {
        TransformBuffer {
            tree: RwLock::new(FrameTree::default()),
            tolerance: tolerance.max(0.0),
            lock_timeout,
            history: history.max(1),
        }
    }

    /// Creates a buffer from configuration and loads its static transforms
    pub fn from_config(config: &TransformConfig) -> Result<Self, TransformError> {
        let buffer = TransformBuffer::new(
            config.tolerance_secs,
            Duration::from_millis(config.lock_timeout_ms),
            config.history,
        );
        for entry in &config.static_transforms {
            buffer.set_static_transform(entry.to_transform())?;
        }
        debug!(
            "Transform buffer created with {} static transforms",
            config.static_transforms.len()
        );
        Ok(buffer)
    }

    /// Adds a time-stamped transform sample.
    ///
    /// Samples may arrive out of order; they are kept sorted and the oldest
    /// are dropped once the history is full. A child announced with a new
    /// parent is re-attached and loses its previous history. Samples whose
    /// stamp is not finite are refused.
    pub fn set_transform(&self, transform: StampedTransform) -> Result<(), TransformError> {
        if !transform.stamp.is_finite() {
            return Err(TransformError::InvalidStamp(transform.stamp));
        }
        if transform.parent_frame == transform.child_frame {
            warn!(
                "Ignoring transform of frame '{}' onto itself",
                transform.child_frame
            );
            return Ok(());
        }

        let mut tree = self
            .tree
            .try_write_for(self.lock_timeout)
            .ok_or(TransformError::Timeout(self.lock_timeout))?;

        let StampedTransform {
            parent_frame,
            child_frame,
            stamp,
            isometry,
        } = transform;

        let edge = tree.edges.entry(child_frame.clone()).or_insert_with(|| Edge {
            parent: parent_frame.clone(),
            samples: VecDeque::new(),
            is_static: false,
        });
        if edge.parent != parent_frame || edge.is_static {
            if edge.parent != parent_frame {
                warn!(
                    "Frame '{}' re-parented from '{}' to '{}'",
                    child_frame, edge.parent, parent_frame
                );
            }
            edge.parent = parent_frame;
            edge.samples.clear();
            edge.is_static = false;
        }

        let position = edge.samples.partition_point(|&(time, _)| time <= stamp);
        if position > 0 && edge.samples[position - 1].0 == stamp {
            edge.samples[position - 1].1 = isometry;
        } else {
            edge.samples.insert(position, (stamp, isometry));
        }
        while edge.samples.len() > self.history {
            edge.samples.pop_front();
        }
        Ok(())
    }

    /// Adds a transform valid at all times
    pub fn set_static_transform(&self, transform: StampedTransform) -> Result<(), TransformError> {
        if !transform.stamp.is_finite() {
            return Err(TransformError::InvalidStamp(transform.stamp));
        }
        if transform.parent_frame == transform.child_frame {
            warn!(
                "Ignoring static transform of frame '{}' onto itself",
                transform.child_frame
            );
            return Ok(());
        }

        let mut tree = self
            .tree
            .try_write_for(self.lock_timeout)
            .ok_or(TransformError::Timeout(self.lock_timeout))?;
        tree.edges.insert(
            transform.child_frame,
            Edge {
                parent: transform.parent_frame,
                samples: VecDeque::from([(transform.stamp, transform.isometry)]),
                is_static: true,
            },
        );
        Ok(())
    }

    /// True when a lookup with the same arguments would succeed
    pub fn can_transform(&self, target_frame: &str, source_frame: &str, stamp: Option<f64>) -> bool {
        self.lookup_transform(target_frame, source_frame, stamp).is_ok()
    }

    /// All frames currently known, sorted
    pub fn frames(&self) -> Vec<String> {
        let tree = self.tree.read();
        let mut frames: Vec<String> = tree
            .edges
            .iter()
            .flat_map(|(child, edge)| [child.clone(), edge.parent.clone()])
            .collect();
        frames.sort();
        frames.dedup();
        frames
    }

    /// Drops every dynamic edge, keeping static transforms
    pub fn clear(&self) {
        self.tree.write().edges.retain(|_, edge| edge.is_static);
    }
}

impl TransformLookup for TransformBuffer {
    fn lookup_transform(
        &self,
        target_frame: &str,
        source_frame: &str,
        stamp: Option<f64>,
    ) -> Result<StampedTransform, TransformError> {
        if let Some(stamp) = stamp.filter(|stamp| !stamp.is_finite()) {
            return Err(TransformError::InvalidStamp(stamp));
        }
        if target_frame == source_frame {
            return Ok(StampedTransform::identity(target_frame, stamp.unwrap_or(0.0)));
        }

        let tree = self
            .tree
            .try_read_for(self.lock_timeout)
            .ok_or(TransformError::Timeout(self.lock_timeout))?;
        tree.lookup(target_frame, source_frame, stamp, self.tolerance)
    }
}
