use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result};
use log::{info, warn};
use opencv::{
    core::{Mat, Rect, Size, Vector},
    imgcodecs, imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};

/// Camera capture on a dedicated thread, keeping only the latest frame.
/// Exclusively owned by one practice run; `stop` (or drop) releases the
/// device and joins the thread.
pub struct CameraStream {
    latest: Arc<Mutex<Option<Mat>>>,
    running: Arc<AtomicBool>,
    width: u32,
    height: u32,
    handle: Option<thread::JoinHandle<()>>,
}

impl CameraStream {
    pub fn open(index: i32, width: u32, height: u32) -> Result<Self> {
        let mut capture = VideoCapture::new(index, VideoCaptureAPIs::CAP_ANY as i32)
            .context("Failed to access camera.")?;
        if !capture.is_opened()? {
            anyhow::bail!("Camera {} is not available", index);
        }

        capture.set(videoio::CAP_PROP_FRAME_WIDTH, width as f64)?;
        capture.set(videoio::CAP_PROP_FRAME_HEIGHT, height as f64)?;
        capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0)?;

        let actual_width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let actual_height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        info!("camera {} opened at {}x{}", index, actual_width, actual_height);

        let latest = Arc::new(Mutex::new(None::<Mat>));
        let running = Arc::new(AtomicBool::new(true));

        let latest_ref = latest.clone();
        let running_ref = running.clone();
        let handle = thread::spawn(move || {
            let mut frame = Mat::default();
            while running_ref.load(Ordering::Relaxed) {
                match capture.read(&mut frame) {
                    Ok(true) if !frame.empty() => {
                        if let Ok(copy) = frame.try_clone() {
                            *latest_ref.lock().unwrap() = Some(copy);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("camera read failed: {}", e);
                    }
                }
            }
            // VideoCapture releases the device on drop.
        });

        Ok(Self {
            latest,
            running,
            width: actual_width,
            height: actual_height,
            handle: Some(handle),
        })
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Latest frame, if one has arrived yet. The same frame is returned
    /// until the capture thread stores a newer one.
    pub fn latest_frame(&self) -> Option<Mat> {
        self.latest.lock().unwrap().clone()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            info!("camera released");
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Crops the ROI out of a BGR frame, downsamples it to a square and
/// JPEG-encodes it for the recognizer.
pub fn encode_roi_jpeg(
    frame: &Mat,
    roi: (i32, i32, i32),
    img_size: i32,
    quality: i32,
) -> Result<Vec<u8>> {
    let (x, y, side) = roi;
    let cropped = Mat::roi(frame, Rect::new(x, y, side, side))?.try_clone()?;

    let mut resized = Mat::default();
    imgproc::resize(
        &cropped,
        &mut resized,
        Size::new(img_size, img_size),
        0.0,
        0.0,
        imgproc::INTER_AREA,
    )?;

    let mut buf = Vector::<u8>::new();
    let params = Vector::from_slice(&[imgcodecs::IMWRITE_JPEG_QUALITY, quality]);
    imgcodecs::imencode(".jpg", &resized, &mut buf, &params)?;
    Ok(buf.to_vec())
}

/// Converts a BGR frame into an egui image for the live preview texture.
pub fn frame_to_color_image(frame: &Mat) -> Result<egui::ColorImage> {
    let width = frame.cols() as usize;
    let height = frame.rows() as usize;
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let px = frame.at_2d::<opencv::core::Vec3b>(y as i32, x as i32)?;
            pixels.push(egui::Color32::from_rgb(px[2], px[1], px[0]));
        }
    }
    Ok(egui::ColorImage {
        size: [width, height],
        pixels,
    })
}
