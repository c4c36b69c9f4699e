use rtrb::{Consumer, Producer, RingBuffer};
use tracing::warn;

/// Lock-free SPSC ring carrying PCM16 samples from the capture callback to
/// the recognition worker.
pub struct AudioRingBuffer {
    producer: Producer<i16>,
    consumer: Consumer<i16>,
}

impl AudioRingBuffer {
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = RingBuffer::new(capacity);
        Self { producer, consumer }
    }

    /// Split into halves for the callback thread and the worker thread.
    pub fn split(self) -> (AudioProducer, AudioConsumer) {
        (
            AudioProducer {
                producer: self.producer,
            },
            AudioConsumer {
                consumer: self.consumer,
            },
        )
    }
}

pub struct AudioProducer {
    producer: Producer<i16>,
}

impl AudioProducer {
    /// Write samples from the audio callback. Non-blocking: if the ring
    /// cannot take the whole slice, nothing is written and `Err` is
    /// returned so the caller can count the drop.
    pub fn write(&mut self, samples: &[i16]) -> Result<usize, ()> {
        let mut chunk = match self.producer.write_chunk(samples.len()) {
            Ok(chunk) => chunk,
            Err(_) => {
                warn!(
                    wanted = samples.len(),
                    "Capture ring overflow, dropping frame"
                );
                return Err(());
            }
        };

        // The chunk may wrap; fill both halves.
        let (first, second) = chunk.as_mut_slices();
        let split = first.len();
        first.copy_from_slice(&samples[..split]);
        if !second.is_empty() {
            second.copy_from_slice(&samples[split..]);
        }
        chunk.commit_all();
        Ok(samples.len())
    }

    pub fn slots(&self) -> usize {
        self.producer.slots()
    }
}

pub struct AudioConsumer {
    consumer: Consumer<i16>,
}

impl AudioConsumer {
    /// Read up to `buffer.len()` samples. Non-blocking; returns the number
    /// of samples actually read.
    pub fn read(&mut self, buffer: &mut [i16]) -> usize {
        let chunk = match self.consumer.read_chunk(buffer.len()) {
            Ok(chunk) => chunk,
            Err(rtrb::chunks::ChunkError::TooFewSlots(available)) => {
                if available == 0 {
                    return 0;
                }
                self.consumer.read_chunk(available).unwrap()
            }
        };

        let len = chunk.len();
        let (first, second) = chunk.as_slices();
        let split = first.len();
        buffer[..split].copy_from_slice(first);
        if !second.is_empty() {
            buffer[split..split + second.len()].copy_from_slice(second);
        }
        chunk.commit_all();
        len
    }

    /// Drop everything currently buffered (used while listening is paused).
    pub fn discard_all(&mut self) -> usize {
        let available = self.consumer.slots();
        if available == 0 {
            return 0;
        }
        if let Ok(chunk) = self.consumer.read_chunk(available) {
            let n = chunk.len();
            chunk.commit_all();
            n
        } else {
            0
        }
    }

    pub fn slots(&self) -> usize {
        self.consumer.slots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let (mut tx, mut rx) = AudioRingBuffer::new(1024).split();
        assert_eq!(tx.write(&[1, 2, 3, 4, 5]).unwrap(), 5);

        let mut buf = [0i16; 8];
        assert_eq!(rx.read(&mut buf), 5);
        assert_eq!(&buf[..5], &[1, 2, 3, 4, 5]);
        assert_eq!(rx.read(&mut buf), 0);
    }

    #[test]
    fn overflow_rejects_whole_write() {
        let (mut tx, _rx) = AudioRingBuffer::new(16).split();
        assert!(tx.write(&[0i16; 20]).is_err());
        assert!(tx.write(&[0i16; 16]).is_ok());
        assert!(tx.write(&[0i16; 1]).is_err());
    }

    #[test]
    fn discard_all_empties_the_ring() {
        let (mut tx, mut rx) = AudioRingBuffer::new(64).split();
        tx.write(&[7i16; 48]).unwrap();
        assert_eq!(rx.discard_all(), 48);
        assert_eq!(rx.slots(), 0);
    }

    #[test]
    fn wrapping_write_preserves_order() {
        let (mut tx, mut rx) = AudioRingBuffer::new(8).split();
        tx.write(&[1i16; 6]).unwrap();
        let mut buf = [0i16; 6];
        assert_eq!(rx.read(&mut buf), 6);
        // Next write wraps around the ring boundary.
        let data: Vec<i16> = (0..8).collect();
        tx.write(&data).unwrap();
        let mut buf = [0i16; 8];
        assert_eq!(rx.read(&mut buf), 8);
        assert_eq!(&buf[..], &data[..]);
    }
}
