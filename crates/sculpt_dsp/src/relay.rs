//! Single-Channel Sample Relay
//!
//! A bounded SPSC hand-off of fixed-size sample blocks from the audio
//! callback to the analysis thread, built on `rtrb`. The producer copies
//! samples into a pre-allocated staging block and commits the block to
//! the ring whole-or-not-at-all; a consumer can therefore never observe a
//! torn or partially written block, and blocks arrive in FIFO order.
//!
//! When the ring has no room for a complete block the producer drops the
//! new block silently (and counts it). Losing visualization data is
//! acceptable; stalling the audio thread is not.

use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::DspError;

/// Factory for a connected producer/consumer pair.
pub struct BlockRelay;

impl BlockRelay {
    /// Create a relay moving blocks of `block_len` samples with room for
    /// `capacity_blocks` complete blocks in flight.
    ///
    /// Capacity is configuration, not a constant: size it so overflow is
    /// rare at the consumer's polling rate (a handful of blocks is plenty
    /// for a renderer polling at tens of Hz).
    pub fn with_capacity(
        block_len: usize,
        capacity_blocks: usize,
    ) -> Result<(BlockProducer, BlockConsumer), DspError> {
        if block_len == 0 || capacity_blocks == 0 {
            return Err(DspError::InvalidRelayCapacity {
                block_len,
                capacity_blocks,
            });
        }

        let (ring_producer, ring_consumer) = RingBuffer::<f32>::new(block_len * capacity_blocks);

        let producer = BlockProducer {
            ring: ring_producer,
            staging: vec![0.0; block_len],
            filled: 0,
            dropped: 0,
            block_len,
        };
        let consumer = BlockConsumer {
            ring: ring_consumer,
            block_len,
        };
        Ok((producer, consumer))
    }
}

/// Audio-thread half of the relay.
///
/// # Real-time Safety
///
/// `push_sample`/`push_slice` never allocate, never lock and never wait:
/// the staging block is pre-allocated and a full ring refuses the write.
pub struct BlockProducer {
    ring: Producer<f32>,
    staging: Vec<f32>,
    filled: usize,
    dropped: u64,
    block_len: usize,
}

impl BlockProducer {
    /// Append one sample; publishes a block whenever staging fills up.
    #[inline]
    pub fn push_sample(&mut self, sample: f32) {
        self.staging[self.filled] = sample;
        self.filled += 1;
        if self.filled == self.block_len {
            self.filled = 0;
            self.publish();
        }
    }

    /// Append a run of samples.
    #[inline]
    pub fn push_slice(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.push_sample(sample);
        }
    }

    /// Commit the staging block to the ring, whole or not at all.
    fn publish(&mut self) {
        match self.ring.write_chunk_uninit(self.block_len) {
            Ok(mut chunk) => {
                let (first, second) = chunk.as_mut_slices();
                let split = first.len();
                for (slot, &sample) in first.iter_mut().zip(&self.staging[..split]) {
                    slot.write(sample);
                }
                for (slot, &sample) in second.iter_mut().zip(&self.staging[split..]) {
                    slot.write(sample);
                }
                // Slots were fully initialized above
                unsafe { chunk.commit_all() };
            }
            Err(_) => {
                // Consumer fell behind; drop this block rather than wait
                self.dropped = self.dropped.wrapping_add(1);
            }
        }
    }

    /// Blocks refused because the ring was full
    pub fn dropped_blocks(&self) -> u64 {
        self.dropped
    }

    /// Block size this relay was built with
    pub fn block_len(&self) -> usize {
        self.block_len
    }
}

/// Analysis-thread half of the relay.
pub struct BlockConsumer {
    ring: Consumer<f32>,
    block_len: usize,
}

impl BlockConsumer {
    /// Copy the oldest complete block into `out`, returning `false`
    /// without waiting when none is available.
    ///
    /// `out.len()` must equal [`Self::block_len`].
    pub fn pop_block(&mut self, out: &mut [f32]) -> bool {
        debug_assert_eq!(out.len(), self.block_len);
        match self.ring.read_chunk(self.block_len) {
            Ok(chunk) => {
                let (first, second) = chunk.as_slices();
                out[..first.len()].copy_from_slice(first);
                out[first.len()..first.len() + second.len()].copy_from_slice(second);
                chunk.commit_all();
                true
            }
            Err(_) => false,
        }
    }

    /// Complete blocks currently waiting in the ring
    pub fn blocks_available(&self) -> usize {
        self.ring.slots() / self.block_len
    }

    /// Block size this relay was built with
    pub fn block_len(&self) -> usize {
        self.block_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_sizes() {
        assert!(BlockRelay::with_capacity(0, 4).is_err());
        assert!(BlockRelay::with_capacity(256, 0).is_err());
    }

    #[test]
    fn test_blocks_round_trip_in_order() {
        let (mut tx, mut rx) = BlockRelay::with_capacity(4, 8).unwrap();

        for block in 0..3 {
            let base = block as f32 * 10.0;
            tx.push_slice(&[base, base + 1.0, base + 2.0, base + 3.0]);
        }

        let mut out = [0.0; 4];
        for block in 0..3 {
            assert!(rx.pop_block(&mut out));
            let base = block as f32 * 10.0;
            assert_eq!(out, [base, base + 1.0, base + 2.0, base + 3.0]);
        }
        assert!(!rx.pop_block(&mut out), "relay should now be empty");
    }

    #[test]
    fn test_partial_blocks_are_not_visible() {
        let (mut tx, mut rx) = BlockRelay::with_capacity(8, 4).unwrap();

        // One and a half blocks in: only the complete one may come out.
        tx.push_slice(&[1.0; 12]);
        assert_eq!(rx.blocks_available(), 1);

        let mut out = [0.0; 8];
        assert!(rx.pop_block(&mut out));
        assert!(!rx.pop_block(&mut out));
    }

    #[test]
    fn test_overflow_drops_new_blocks_and_counts() {
        let (mut tx, mut rx) = BlockRelay::with_capacity(4, 2).unwrap();

        for block in 0..5 {
            let value = block as f32;
            tx.push_slice(&[value; 4]);
        }
        assert_eq!(tx.dropped_blocks(), 3);

        // The two oldest blocks survived untouched, in order.
        let mut out = [0.0; 4];
        assert!(rx.pop_block(&mut out));
        assert_eq!(out, [0.0; 4]);
        assert!(rx.pop_block(&mut out));
        assert_eq!(out, [1.0; 4]);
        assert!(!rx.pop_block(&mut out));
    }

    #[test]
    fn test_drained_relay_accepts_new_blocks() {
        let (mut tx, mut rx) = BlockRelay::with_capacity(4, 2).unwrap();
        let mut out = [0.0; 4];

        tx.push_slice(&[1.0; 8]);
        while rx.pop_block(&mut out) {}

        tx.push_slice(&[7.0; 4]);
        assert!(rx.pop_block(&mut out));
        assert_eq!(out, [7.0; 4]);
    }

    #[test]
    fn test_no_torn_blocks_under_concurrent_stress() {
        // Producer thread writes ramp-stamped blocks as fast as it can
        // while the consumer drains; every block read must be exactly one
        // the producer wrote, never a mix of two.
        const BLOCK: usize = 64;
        const BLOCKS: usize = 2_000;

        let (mut tx, mut rx) = BlockRelay::with_capacity(BLOCK, 8).unwrap();

        let writer = std::thread::spawn(move || {
            let mut block = [0.0_f32; BLOCK];
            for n in 0..BLOCKS {
                for (i, sample) in block.iter_mut().enumerate() {
                    *sample = (n * BLOCK + i) as f32;
                }
                tx.push_slice(&block);
            }
            tx.dropped_blocks()
        });

        let mut out = [0.0_f32; BLOCK];
        let mut received = 0_u64;
        let mut last_stamp = None;
        while !writer.is_finished() || rx.blocks_available() > 0 {
            if rx.pop_block(&mut out) {
                let stamp = out[0] as usize;
                assert_eq!(stamp % BLOCK, 0, "block must start on a block boundary");
                for (i, &sample) in out.iter().enumerate() {
                    assert_eq!(sample, (stamp + i) as f32, "torn block detected");
                }
                if let Some(last) = last_stamp {
                    assert!(stamp > last, "blocks arrived out of order");
                }
                last_stamp = Some(stamp);
                received += 1;
            } else {
                std::thread::yield_now();
            }
        }

        let dropped = writer.join().unwrap();
        assert_eq!(received + dropped, BLOCKS as u64);
    }
}
