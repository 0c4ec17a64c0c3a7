//! Startup upload of CPU-side data into GPU buffers.

use crate::rhi::{
    precondition, Backend, Buffer, Device, Queue, QueueType, ResourceTransfer, RhiResult,
    SubmitSerial,
};

/// One whole-buffer write starting at offset 0.
#[derive(Debug, Clone, Copy)]
pub struct BufferWrite<'a> {
    pub buffer: Buffer,
    pub data: &'a [u8],
}

/// How uploads reach the graphics queue. Decided once, at startup.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UploadPath {
    /// No transfer queue: writes go straight to the graphics queue, which orders
    /// them before any later submission.
    Direct { graphics: Queue },
    /// Writes go to the transfer queue; the graphics queue waits on the transfer
    /// submission before it reads anything.
    Staged { transfer: Queue, graphics: Queue },
}

impl UploadPath {
    pub fn select<B: Backend>(device: &Device<B>) -> Self {
        let graphics = device.graphics_queue();
        match device.queue(QueueType::Transfer) {
            Some(transfer) => Self::Staged { transfer, graphics },
            None => Self::Direct { graphics },
        }
    }

    pub fn is_staged(&self) -> bool {
        matches!(self, Self::Staged { .. })
    }

    /// Issues `writes` in order and makes them visible to the graphics queue.
    ///
    /// Returns the transfer submission's serial on the staged path, `None` on the
    /// direct one. Each target buffer may appear once. A write shorter than its
    /// buffer leaves the remaining bytes undefined.
    pub fn upload<B: Backend>(
        &self,
        device: &mut Device<B>,
        writes: &[BufferWrite<'_>],
    ) -> RhiResult<Option<SubmitSerial>> {
        for (i, write) in writes.iter().enumerate() {
            precondition!(
                !writes[..i].iter().any(|w| w.buffer == write.buffer),
                "upload writes {} twice",
                write.buffer
            );
            let size = device.buffer_size(write.buffer);
            if (write.data.len() as u64) < size {
                log::warn!(
                    "upload covers {} of {} bytes of {}; the rest stays undefined",
                    write.data.len(),
                    size,
                    write.buffer
                );
            }
        }

        match *self {
            Self::Direct { graphics } => {
                for write in writes {
                    device.write_buffer(graphics, write.buffer, 0, write.data);
                }
                log::info!("uploaded {} buffer(s) on {graphics}", writes.len());
                Ok(None)
            }
            Self::Staged { transfer, graphics } => {
                for write in writes {
                    device.write_buffer(transfer, write.buffer, 0, write.data);
                }
                let buffers: Vec<Buffer> = writes.iter().map(|w| w.buffer).collect();
                let serial = device.submit(
                    transfer,
                    &[],
                    &[ResourceTransfer {
                        receiving_queue: graphics,
                        buffers: &buffers,
                    }],
                )?;
                device.wait_for(graphics, transfer, serial);
                log::info!(
                    "uploaded {} buffer(s) on {transfer}, {graphics} waits for {serial}",
                    writes.len()
                );
                Ok(Some(serial))
            }
        }
    }
}
