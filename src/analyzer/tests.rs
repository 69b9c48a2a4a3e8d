use super::*;
use crate::frame::Frame;
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::time::SystemTime;

fn test_params() -> MotionParams {
    MotionParams {
        pixel_threshold: 30,
        max_changed_fraction: 1.0,
        image_changes_threshold: 50,
        min_area: 100,
        erosion_radius: None,
    }
}

fn diff_with_block(width: u32, height: u32, x: u32, y: u32, w: u32, h: u32) -> GrayImage {
    let mut diff = GrayImage::new(width, height);
    for dy in 0..h {
        for dx in 0..w {
            diff.put_pixel(x + dx, y + dy, Luma([200]));
        }
    }
    diff
}

fn frame_with_square(id: u64, width: u32, height: u32, square: Option<(u32, u32, u32)>) -> Frame {
    let mut image = RgbImage::new(width, height);
    if let Some((x, y, size)) = square {
        for dy in 0..size {
            for dx in 0..size {
                image.put_pixel(x + dx, y + dy, Rgb([255, 255, 255]));
            }
        }
    }
    Frame::new(id, SystemTime::now(), image)
}

#[test]
fn test_changes_below_threshold_never_report_motion() {
    let detector = MotionDetector::with_params(test_params(), None).unwrap();

    // 4x5 = 20 changed pixels, threshold is 50
    let diff = diff_with_block(100, 100, 40, 40, 4, 5);
    let result = detector.analyze_difference(&diff, (100, 100));

    assert_eq!(result.changes, 20);
    assert!(!result.motion);
    assert!(result.rect.is_empty());
}

#[test]
fn test_changes_and_area_above_thresholds_report_motion() {
    let detector = MotionDetector::with_params(test_params(), None).unwrap();

    let diff = diff_with_block(100, 100, 10, 10, 20, 20);
    let result = detector.analyze_difference(&diff, (100, 100));

    assert!(result.motion);
    assert_eq!(result.changes, 400);
    assert_eq!(result.regions, 1);
    assert_eq!(
        result.rect,
        MotionRect {
            x: 10,
            y: 10,
            width: 20,
            height: 20
        }
    );
}

#[test]
fn test_small_box_rejected_by_area() {
    let mut params = test_params();
    params.min_area = 1000;
    let detector = MotionDetector::with_params(params, None).unwrap();

    let diff = diff_with_block(100, 100, 10, 10, 20, 20);
    let result = detector.analyze_difference(&diff, (100, 100));

    assert_eq!(result.changes, 400);
    assert!(!result.motion);
    assert_eq!(result.rect.area(), 0);
}

#[test]
fn test_erosion_removes_isolated_noise() {
    let mut params = test_params();
    params.erosion_radius = Some(1);
    params.image_changes_threshold = 5;
    params.min_area = 1;
    let detector = MotionDetector::with_params(params, None).unwrap();

    let mut noise = GrayImage::new(100, 100);
    for i in 0..30u32 {
        noise.put_pixel((i * 7) % 100, (i * 13) % 100, Luma([255]));
    }
    let result = detector.analyze_difference(&noise, (100, 100));
    assert_eq!(result.changes, 0);
    assert!(!result.motion);

    let block = diff_with_block(100, 100, 10, 10, 20, 20);
    let result = detector.analyze_difference(&block, (100, 100));
    assert!(result.motion);
    assert_eq!(result.changes, 18 * 18);
    assert_eq!(
        result.rect,
        MotionRect {
            x: 11,
            y: 11,
            width: 18,
            height: 18
        }
    );
}

#[test]
fn test_global_change_gate_is_monotonic() {
    let mut params = test_params();
    params.max_changed_fraction = 0.4;
    let detector = MotionDetector::with_params(params, None).unwrap();

    // 30% of the frame is an object
    let result = detector.analyze_difference(&diff_with_block(100, 100, 0, 0, 100, 30), (100, 100));
    assert!(result.motion);
    assert!((result.changed_fraction - 0.3).abs() < 1e-9);

    // anything past the limit is global, however large
    for rows in [41, 50, 80, 100] {
        let diff = diff_with_block(100, 100, 0, 0, 100, rows);
        let result = detector.analyze_difference(&diff, (100, 100));
        assert!(!result.motion, "{} rows reported motion", rows);
        assert!(result.rect.is_empty());
        assert_eq!(result.changes, 100 * rows as usize);
    }
}

#[test]
fn test_presets_ignore_full_frame_change_but_report_objects() {
    let full = diff_with_block(100, 100, 0, 0, 100, 100);
    // 50x60 covers 30% of the frame
    let object = diff_with_block(100, 100, 20, 20, 50, 60);

    for sensitivity in [
        MotionSensitivity::Low,
        MotionSensitivity::Medium,
        MotionSensitivity::High,
        MotionSensitivity::VeryHigh,
    ] {
        let detector = MotionDetector::new(sensitivity, false, 0.5).unwrap();

        let result = detector.analyze_difference(&full, (100, 100));
        assert!(!result.motion, "{:?}: lighting change reported as motion", sensitivity);
        assert_eq!(result.changed_fraction, 1.0);

        let result = detector.analyze_difference(&object, (100, 100));
        assert!(result.motion, "{:?}: object not detected", sensitivity);
        assert!(result.rect.x >= 20 && result.rect.x + result.rect.width <= 70);
        assert!(result.rect.y >= 20 && result.rect.y + result.rect.height <= 80);
    }
}

#[test]
fn test_three_frame_history_compares_current_and_prev() {
    let mut params = test_params();
    params.erosion_radius = Some(1);
    let mut detector = MotionDetector::with_params(params, None).unwrap();

    let still = |id| frame_with_square(id, 64, 48, None);
    let moved = |id| frame_with_square(id, 64, 48, Some((20, 10, 16)));

    assert!(!detector.process(&still(0)).motion);
    assert_eq!(detector.history_len(), 1);
    assert!(!detector.process(&still(1)).motion);
    assert_eq!(detector.history_len(), 2);

    // prev and current are both still frames
    assert!(!detector.process(&moved(2)).motion);
    assert_eq!(detector.history_len(), 3);

    // the square is now "current" and the still frame is "prev"
    let result = detector.process(&moved(3));
    assert!(result.motion);
    assert_eq!(
        result.rect,
        MotionRect {
            x: 21,
            y: 11,
            width: 14,
            height: 14
        }
    );
    assert_eq!(detector.last_result(), &result);

    // scene stopped changing
    assert!(!detector.process(&moved(4)).motion);
    assert_eq!(detector.history_len(), 3);
    assert_eq!(detector.frames_analyzed(), 5);
}

#[test]
fn test_frame_size_change_resets_history() {
    let mut detector = MotionDetector::with_params(test_params(), None).unwrap();
    detector.process(&frame_with_square(0, 64, 48, None));
    detector.process(&frame_with_square(1, 64, 48, None));
    assert_eq!(detector.history_len(), 2);

    detector.process(&frame_with_square(2, 32, 24, None));
    assert_eq!(detector.history_len(), 1);
}

#[test]
fn test_off_mode_never_touches_history() {
    let mut detector = MotionDetector::new(MotionSensitivity::Off, false, 0.5).unwrap();
    assert!(!detector.is_enabled());

    for id in 0..10 {
        let square = if id % 2 == 0 { None } else { Some((10, 10, 20)) };
        let result = detector.process(&frame_with_square(id, 64, 48, square));
        assert!(!result.motion);
        assert_eq!(result.rect.area(), 0);
    }

    assert_eq!(detector.history_len(), 0);
    assert_eq!(detector.frames_analyzed(), 0);
}

#[test]
fn test_shrunk_analysis_rescales_rect() {
    let mut detector = MotionDetector::with_params(test_params(), Some(0.5)).unwrap();

    detector.process(&frame_with_square(0, 128, 96, None));
    detector.process(&frame_with_square(1, 128, 96, None));
    detector.process(&frame_with_square(2, 128, 96, Some((32, 32, 32))));
    let result = detector.process(&frame_with_square(3, 128, 96, Some((32, 32, 32))));

    assert!(result.motion);
    assert!((28..=34).contains(&result.rect.x), "x = {}", result.rect.x);
    assert!((28..=34).contains(&result.rect.y), "y = {}", result.rect.y);
    assert!((28..=40).contains(&result.rect.width), "w = {}", result.rect.width);
    assert!((28..=40).contains(&result.rect.height), "h = {}", result.rect.height);
    // counts are reported in full-resolution pixels
    assert!(result.changes >= 32 * 32);
}

#[test]
fn test_invalid_scalar_rejected() {
    assert!(MotionDetector::with_params(test_params(), Some(0.0)).is_err());
    assert!(MotionDetector::with_params(test_params(), Some(1.5)).is_err());
    assert!(MotionDetector::new(MotionSensitivity::Medium, true, -1.0).is_err());
    // scalar is ignored when shrinking is off
    assert!(MotionDetector::new(MotionSensitivity::Medium, false, -1.0).is_ok());
}

#[test]
fn test_presets_scale_with_sensitivity() {
    assert!(MotionSensitivity::Off.params().is_none());
    let low = MotionSensitivity::Low.params().unwrap();
    let high = MotionSensitivity::High.params().unwrap();
    let very_high = MotionSensitivity::VeryHigh.params().unwrap();

    assert!(low.image_changes_threshold > high.image_changes_threshold);
    assert!(low.min_area > high.min_area);
    assert!(high.pixel_threshold > very_high.pixel_threshold);
    assert!(low.max_changed_fraction < very_high.max_changed_fraction);
}

#[test]
fn test_annotate_draws_box_on_copy() {
    let frame = frame_with_square(1, 20, 20, None);
    let rect = MotionRect {
        x: 5,
        y: 5,
        width: 10,
        height: 10,
    };

    let annotated = annotate(&frame, &rect);
    assert_eq!(annotated.image.get_pixel(5, 5), &Rgb([0, 255, 0]));
    assert_eq!(annotated.image.get_pixel(6, 6), &Rgb([0, 255, 0]));
    assert_eq!(annotated.image.get_pixel(14, 10), &Rgb([0, 255, 0]));
    assert_eq!(annotated.image.get_pixel(10, 10), &Rgb([0, 0, 0]));
    assert_eq!(frame.image.get_pixel(5, 5), &Rgb([0, 0, 0]));

    let untouched = annotate(&frame, &MotionRect::default());
    assert_eq!(untouched.image, frame.image);
}
