//! The GPU-resident A-buffer: head table, fragment pool, allocation counter.
//!
//! These three buffers back the per-pixel fragment linked lists. The
//! accumulation pass pushes onto them through atomics (fetch-and-increment
//! for slot allocation, exchange for the per-pixel head) and the combine
//! pass walks them read-only. [`ABuffer`] is their sole owner; passes reach
//! them only through the write/read bind groups it hands out, and the only
//! lifecycle operation is [`ABuffer::reset`] once per frame.
//!
//! Layout decisions:
//! - A head entry of `0` means "no fragments"; non-empty entries store
//!   `slot + 1`. That makes the whole table resettable with one buffer
//!   clear.
//! - Fragment records are 32 bytes (vec4 color, f32 depth, u32 next link,
//!   8 bytes pad), matching the WGSL struct stride.
//! - The pool is sized for `max_fragments_per_pixel` records per pixel and
//!   clamped to the device's maximum storage binding size; fragments
//!   allocated past the clamped capacity are dropped by the accumulation
//!   shader before any pool write, so capacity is a hard bound on slot
//!   indices.

use crate::config::RendererConfig;
use crate::error::Error;
use crate::gpu::GpuContext;

/// Size in bytes of one fragment record, matching the WGSL stride.
pub const FRAGMENT_RECORD_SIZE: u64 = 32;

const COUNTER_SIZE: wgpu::BufferSize = wgpu::BufferSize::new(4).unwrap();

/// One transparent fragment, as stored in the fragment pool.
///
/// Written exactly once by the accumulation shader, never mutated, and read
/// back only by the combine pass. The Rust mirror exists for layout
/// assertions and the CPU-side resolve reference.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FragmentRecord {
    /// Fragment color; alpha drives the composite.
    pub color: [f32; 4],
    /// View-space distance along the view axis, used for depth ordering.
    pub depth: f32,
    /// Head-table encoding of the next fragment (`slot + 1`, `0` = end).
    pub next: u32,
    pub _pad: [f32; 2],
}

/// Accumulation-shader parameters (dimensions and pool capacity).
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ABufferParams {
    width: u32,
    height: u32,
    capacity: u32,
    _pad: u32,
}

/// Computes the fragment pool capacity in records.
///
/// The requested byte size (`pixels * budget * record size`) is clamped to
/// the device's maximum storage binding size before converting back to a
/// record count.
pub fn pool_capacity(width: u32, height: u32, max_fragments_per_pixel: u32, limit: u64) -> u64 {
    let wanted =
        width as u64 * height as u64 * max_fragments_per_pixel as u64 * FRAGMENT_RECORD_SIZE;
    wanted.min(limit) / FRAGMENT_RECORD_SIZE
}

/// Owns the three shared GPU structures backing the per-pixel lists.
pub struct ABuffer {
    counter: wgpu::Buffer,
    heads: wgpu::Buffer,
    #[allow(dead_code)]
    pool: wgpu::Buffer,
    #[allow(dead_code)]
    params: wgpu::Buffer,
    /// Layout for the accumulation pass (atomic read-write access).
    pub(crate) write_layout: wgpu::BindGroupLayout,
    pub(crate) write_bind_group: wgpu::BindGroup,
    /// Layout for the combine pass (read-only access).
    pub(crate) read_layout: wgpu::BindGroupLayout,
    pub(crate) read_bind_group: wgpu::BindGroup,
    capacity: u32,
}

impl ABuffer {
    /// Allocates the head table, fragment pool, and counter for the given
    /// surface size.
    ///
    /// Fails only if the device's storage binding limit cannot hold a single
    /// record, which is a fatal startup condition.
    pub fn new(gpu: &GpuContext, config: &RendererConfig) -> Result<Self, Error> {
        let device = &gpu.device;
        let (width, height) = (gpu.width(), gpu.height());

        let limit = device.limits().max_storage_buffer_binding_size as u64;
        let capacity = pool_capacity(width, height, config.max_fragments_per_pixel, limit);
        if capacity == 0 {
            return Err(Error::FragmentPoolTooSmall {
                limit: limit as u32,
            });
        }

        let pool_bytes = capacity * FRAGMENT_RECORD_SIZE;
        let head_bytes = width as u64 * height as u64 * 4;
        log::info!(
            "A-buffer: {}x{}, {} fragments/pixel budget, pool {:.1} MB ({} records), heads {:.1} MB",
            width,
            height,
            config.max_fragments_per_pixel,
            pool_bytes as f64 / 1024.0 / 1024.0,
            capacity,
            head_bytes as f64 / 1024.0 / 1024.0,
        );

        let counter = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Fragment Counter"),
            size: 4,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let heads = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Fragment Head Table"),
            size: head_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let pool = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Fragment Pool"),
            size: pool_bytes,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("A-Buffer Params"),
            size: std::mem::size_of::<ABufferParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        gpu.queue.write_buffer(
            &params,
            0,
            bytemuck::cast_slice(&[ABufferParams {
                width,
                height,
                capacity: capacity as u32,
                _pad: 0,
            }]),
        );

        let storage_entry = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let write_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("A-Buffer Write Layout"),
            entries: &[
                storage_entry(0, false), // counter
                storage_entry(1, false), // heads
                storage_entry(2, false), // pool
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let write_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("A-Buffer Write Bind Group"),
            layout: &write_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: counter.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: heads.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: pool.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params.as_entire_binding(),
                },
            ],
        });

        let read_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("A-Buffer Read Layout"),
            entries: &[
                storage_entry(0, true), // heads
                storage_entry(1, true), // pool
            ],
        });

        let read_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("A-Buffer Read Bind Group"),
            layout: &read_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: heads.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: pool.as_entire_binding(),
                },
            ],
        });

        Ok(Self {
            counter,
            heads,
            pool,
            params,
            write_layout,
            write_bind_group,
            read_layout,
            read_bind_group,
            capacity: capacity as u32,
        })
    }

    /// Fragment pool capacity in records.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Clears every head entry to the empty sentinel and zeroes the
    /// allocation counter.
    ///
    /// The head clear is recorded into `encoder` between the opaque and
    /// accumulation passes; the counter write goes through the queue's
    /// staging path, which executes ahead of the submitted command buffer.
    /// Both are therefore ordered before any accumulation draw of the same
    /// submission, satisfying the pass's hard precondition without a
    /// blocking map. The scoped write view is released on every exit path
    /// when it drops.
    pub fn reset(&self, queue: &wgpu::Queue, encoder: &mut wgpu::CommandEncoder) {
        encoder.clear_buffer(&self.heads, 0, None);

        if let Some(mut view) = queue.write_buffer_with(&self.counter, 0, COUNTER_SIZE) {
            view.copy_from_slice(&0u32.to_le_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_record_matches_wgsl_stride() {
        assert_eq!(std::mem::size_of::<FragmentRecord>() as u64, FRAGMENT_RECORD_SIZE);
        assert_eq!(std::mem::align_of::<FragmentRecord>(), 4);
    }

    #[test]
    fn pool_capacity_unclamped() {
        // 16 pixels, 8 per pixel, generous limit: full budget.
        assert_eq!(pool_capacity(4, 4, 8, u64::MAX), 16 * 8);
    }

    #[test]
    fn pool_capacity_clamps_to_device_limit() {
        // 1280x720 at 8 records needs ~225 MiB; a 128 MiB limit clamps it.
        let limit = 128 * 1024 * 1024;
        let capacity = pool_capacity(1280, 720, 8, limit);
        assert_eq!(capacity, limit / FRAGMENT_RECORD_SIZE);
        assert!(capacity < 1280 * 720 * 8);
    }

    #[test]
    fn pool_capacity_zero_when_limit_below_record() {
        assert_eq!(pool_capacity(1280, 720, 8, FRAGMENT_RECORD_SIZE - 1), 0);
    }

    /// CPU model of the GPU insertion protocol, using the same primitives
    /// (fetch-and-increment slot allocation, exchange-based head push) over
    /// std atomics. The GPU-side properties that cannot run in unit tests
    /// are exercised here against real concurrent writers.
    mod protocol {
        use std::sync::OnceLock;
        use std::sync::atomic::{AtomicU32, Ordering};

        pub struct ListModel {
            pub counter: AtomicU32,
            pub heads: Vec<AtomicU32>,
            pub pool: Vec<OnceLock<(f32, u32)>>,
            pub capacity: u32,
        }

        impl ListModel {
            pub fn new(pixels: usize, capacity: u32) -> Self {
                Self {
                    counter: AtomicU32::new(0),
                    heads: (0..pixels).map(|_| AtomicU32::new(0)).collect(),
                    pool: (0..capacity as usize).map(|_| OnceLock::new()).collect(),
                    capacity,
                }
            }

            /// Mirrors the accumulation shader: allocate, bounds-check,
            /// write the record, exchange the head.
            pub fn push(&self, pixel: usize, depth: f32) -> bool {
                let slot = self.counter.fetch_add(1, Ordering::Relaxed);
                if slot >= self.capacity {
                    return false;
                }
                let prev = self.heads[pixel].swap(slot + 1, Ordering::AcqRel);
                self.pool[slot as usize]
                    .set((depth, prev))
                    .expect("slot written twice");
                true
            }

            pub fn reset(&self) {
                self.counter.store(0, Ordering::Relaxed);
                for head in &self.heads {
                    head.store(0, Ordering::Relaxed);
                }
            }

            /// Walks one pixel's list, bounded by `max_depth`.
            pub fn walk(&self, pixel: usize, max_depth: usize) -> Vec<f32> {
                let mut out = Vec::new();
                let mut entry = self.heads[pixel].load(Ordering::Acquire);
                while entry != 0 && out.len() < max_depth {
                    let (depth, next) = *self.pool[entry as usize - 1].get().unwrap();
                    out.push(depth);
                    entry = next;
                }
                out
            }
        }
    }

    use protocol::ListModel;

    #[test]
    fn counter_counts_surviving_fragments() {
        let model = ListModel::new(4, 64);
        for i in 0..10 {
            assert!(model.push(i % 4, i as f32));
        }
        assert_eq!(model.counter.load(std::sync::atomic::Ordering::Relaxed), 10);
    }

    #[test]
    fn push_is_lifo_per_pixel() {
        let model = ListModel::new(1, 16);
        for depth in [3.0, 1.0, 2.0] {
            model.push(0, depth);
        }
        assert_eq!(model.walk(0, 8), vec![2.0, 1.0, 3.0]);
    }

    #[test]
    fn untouched_heads_stay_at_sentinel() {
        let model = ListModel::new(8, 16);
        model.push(3, 1.0);
        for (i, head) in model.heads.iter().enumerate() {
            let value = head.load(std::sync::atomic::Ordering::Relaxed);
            if i == 3 {
                assert_ne!(value, 0);
            } else {
                assert_eq!(value, 0);
            }
        }
    }

    #[test]
    fn overflow_retains_exactly_capacity() {
        let capacity = 32;
        let model = ListModel::new(4, capacity);
        let mut retained = 0;
        for i in 0..(capacity + 17) {
            if model.push(i as usize % 4, i as f32) {
                retained += 1;
            }
        }
        assert_eq!(retained, capacity);
        // Every pool slot was written exactly once; nothing out of bounds.
        assert!(model.pool.iter().all(|slot| slot.get().is_some()));
    }

    #[test]
    fn reset_is_idempotent() {
        let model = ListModel::new(4, 16);
        for i in 0..8 {
            model.push(i % 4, i as f32);
        }
        model.reset();
        let counter_once = model.counter.load(std::sync::atomic::Ordering::Relaxed);
        let heads_once: Vec<u32> = model
            .heads
            .iter()
            .map(|h| h.load(std::sync::atomic::Ordering::Relaxed))
            .collect();
        model.reset();
        assert_eq!(model.counter.load(std::sync::atomic::Ordering::Relaxed), counter_once);
        assert_eq!(counter_once, 0);
        let heads_twice: Vec<u32> = model
            .heads
            .iter()
            .map(|h| h.load(std::sync::atomic::Ordering::Relaxed))
            .collect();
        assert_eq!(heads_once, heads_twice);
        assert!(heads_twice.iter().all(|&h| h == 0));
    }

    #[test]
    fn concurrent_insertion_is_lossless_under_capacity() {
        use std::sync::Arc;

        let threads = 8;
        let per_thread = 250;
        let model = Arc::new(ListModel::new(16, (threads * per_thread) as u32));

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let model = Arc::clone(&model);
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        let pixel = (t * per_thread + i) % 16;
                        assert!(model.push(pixel, (t * per_thread + i) as f32));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            model.counter.load(std::sync::atomic::Ordering::Relaxed),
            (threads * per_thread) as u32
        );
        // Every fragment landed on some pixel's list exactly once.
        let total: usize = (0..16).map(|p| model.walk(p, usize::MAX).len()).sum();
        assert_eq!(total, threads * per_thread);
    }
}
