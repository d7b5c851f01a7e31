// src/ui.rs
// HTTP handlers: run a simulation, render its charts into in-memory PNG
// buffers and return them as base64 data URLs alongside the raw data the
// frontend needs for animation and reporting.

use crate::pendulum::{PendulumConfig, PendulumState, TraceSample};
use crate::rainbow::{self, CurveSummary, RainbowConfig, RainbowScan};
use actix_web::{web, HttpResponse, Result};
use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;
use log::{info, warn};
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::{self, Cursor};

// Chart dimensions in pixels.
const W: u32 = 640;
const H: u32 = 480;

fn default_frames() -> usize {
    350
}

fn default_fps() -> u32 {
    30
}

#[derive(Deserialize)]
pub struct PendulumParams {
    #[serde(flatten)]
    config: PendulumConfig,
    /// Number of animation frames to simulate.
    #[serde(default = "default_frames")]
    frames: usize,
    /// Nominal animation rate; the step size is `1 / fps`.
    #[serde(default = "default_fps")]
    fps: u32,
}

#[derive(Serialize)]
struct PendulumResponse {
    success: bool,
    /// alpha(t) chart as a PNG data URL.
    chart: String,
    animation: AnimationData,
}

#[derive(Serialize)]
struct AnimationData {
    /// Bob position per frame, starting with the initial state.
    positions: Vec<(f64, f64)>,
    pivot: (f64, f64),
    /// Plot boundary for consistent scaling on the frontend canvas.
    limit: f64,
    fps: u32,
}

#[derive(Serialize)]
struct RainbowResponse {
    success: bool,
    /// Deflection-angle-vs-impact-parameter chart as a PNG data URL.
    deflection_chart: String,
    /// Intensity-vs-deflection-angle chart as a PNG data URL.
    intensity_chart: String,
    report: RainbowReport,
}

/// One summary per color and reflection order. `null` when a curve had no
/// finite intensity sample at all.
#[derive(Serialize)]
struct RainbowReport {
    primary_red: Option<CurveSummary>,
    primary_purple: Option<CurveSummary>,
    secondary_red: Option<CurveSummary>,
    secondary_purple: Option<CurveSummary>,
}

/// Uniform rejection body for invalid parameters and failed runs.
fn reject(reason: &str) -> HttpResponse {
    warn!("request rejected: {reason}");
    HttpResponse::Ok().json(serde_json::json!({ "success": false, "error": reason }))
}

pub async fn pendulum_handler(params: web::Json<PendulumParams>) -> Result<HttpResponse> {
    let params = params.into_inner();
    if params.config.length <= 0.0 {
        return Ok(reject("length must be positive"));
    }
    if params.config.damping < 0.0 {
        return Ok(reject("damping must be non-negative"));
    }
    if params.frames == 0 || params.fps == 0 {
        return Ok(reject("frames and fps must be positive"));
    }

    let dt = 1.0 / params.fps as f64;
    let mut state = PendulumState::new(&params.config);
    let mut trace: Vec<TraceSample> = Vec::new();
    let mut positions = Vec::with_capacity(params.frames + 1);
    positions.push(state.position());
    for _ in 0..params.frames {
        if let Err(err) = state.step_traced(dt, &mut |sample| trace.push(sample)) {
            return Ok(reject(&format!("integration failed: {err}")));
        }
        positions.push(state.position());
    }
    info!(
        "pendulum run: {} frames at {} fps, {} trace samples, final alpha {:.4} rad",
        params.frames,
        params.fps,
        trace.len(),
        state.alpha
    );

    let chart = render_alpha_chart(&trace)?;
    Ok(HttpResponse::Ok().json(PendulumResponse {
        success: true,
        chart,
        animation: AnimationData {
            positions,
            pivot: state.pivot,
            limit: state.length + 0.5,
            fps: params.fps,
        },
    }))
}

pub async fn rainbow_handler(params: web::Json<RainbowConfig>) -> Result<HttpResponse> {
    let config = params.into_inner();
    if config.resolution < 2 {
        return Ok(reject("resolution must be at least 2"));
    }
    if config.refractive_index_red <= 1.0 || config.refractive_index_purple <= 1.0 {
        return Ok(reject("refractive indices must exceed 1"));
    }

    let scan = match rainbow::generate_scan(&config) {
        Ok(scan) => scan,
        Err(err) => return Ok(reject(&format!("scan failed: {err}"))),
    };
    let dy = scan.sample_step();
    let intensity_primary_red = rainbow::derive_intensity(&scan.primary_red, dy);
    let intensity_primary_purple = rainbow::derive_intensity(&scan.primary_purple, dy);
    let intensity_secondary_red = rainbow::derive_intensity(&scan.secondary_red, dy);
    let intensity_secondary_purple = rainbow::derive_intensity(&scan.secondary_purple, dy);

    let report = RainbowReport {
        primary_red: rainbow::summarize(&scan.primary_red, &intensity_primary_red),
        primary_purple: rainbow::summarize(&scan.primary_purple, &intensity_primary_purple),
        secondary_red: rainbow::summarize(&scan.secondary_red, &intensity_secondary_red),
        secondary_purple: rainbow::summarize(&scan.secondary_purple, &intensity_secondary_purple),
    };
    if let Some(summary) = &report.primary_red {
        info!(
            "rainbow scan at resolution {}: red primary bow at {:.4} deg",
            config.resolution, summary.rainbow_angle
        );
    }

    let deflection_chart = render_deflection_chart(&scan)?;
    let intensity_chart = render_intensity_chart(
        &scan,
        [
            &intensity_primary_red,
            &intensity_primary_purple,
            &intensity_secondary_red,
            &intensity_secondary_purple,
        ],
    )?;
    Ok(HttpResponse::Ok().json(RainbowResponse {
        success: true,
        deflection_chart,
        intensity_chart,
        report,
    }))
}

/// Draw the angular displacement trace against time.
fn render_alpha_chart(trace: &[TraceSample]) -> Result<String> {
    let t_max = trace.last().map_or(1.0, |sample| sample.time);
    let (lo, hi) = finite_bounds(trace.iter().map(|sample| sample.alpha));
    let pad = 0.05 * (hi - lo).max(1e-9);

    let mut pixels = vec![0u8; (W * H * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (W, H)).into_drawing_area();
        root.fill(&WHITE).map_err(io::Error::other)?;
        let mut chart = ChartBuilder::on(&root)
            .caption("alpha(t), rad", ("sans-serif", 20).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(0.0..t_max, (lo - pad)..(hi + pad))
            .map_err(io::Error::other)?;
        chart.configure_mesh().draw().map_err(io::Error::other)?;
        chart
            .draw_series(LineSeries::new(
                trace.iter().map(|sample| (sample.time, sample.alpha)),
                BLUE.mix(0.9).stroke_width(2),
            ))
            .map_err(io::Error::other)?;
        root.present().map_err(io::Error::other)?;
    }
    encode_png(pixels)
}

/// Draw the four deflection curves over the impact parameter.
fn render_deflection_chart(scan: &RainbowScan) -> Result<String> {
    let curves: [(&[f64], ShapeStyle); 4] = [
        (&scan.primary_red, RED.mix(0.85).stroke_width(2)),
        (&scan.primary_purple, MAGENTA.mix(0.85).stroke_width(2)),
        (&scan.secondary_red, RED.mix(0.85).stroke_width(2)),
        (&scan.secondary_purple, MAGENTA.mix(0.85).stroke_width(2)),
    ];
    let (lo, hi) = finite_bounds(curves.iter().flat_map(|(angles, _)| angles.iter().copied()));
    let pad = 0.05 * (hi - lo).max(1e-9);

    let mut pixels = vec![0u8; (W * H * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (W, H)).into_drawing_area();
        root.fill(&WHITE).map_err(io::Error::other)?;
        let mut chart = ChartBuilder::on(&root)
            .caption("phi(y), red and purple", ("sans-serif", 20).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(0.0..1.0, (lo - pad)..(hi + pad))
            .map_err(io::Error::other)?;
        chart.configure_mesh().draw().map_err(io::Error::other)?;
        for (angles, style) in curves {
            chart
                .draw_series(LineSeries::new(
                    scan.y.iter().copied().zip(angles.iter().copied()),
                    style,
                ))
                .map_err(io::Error::other)?;
        }
        root.present().map_err(io::Error::other)?;
    }
    encode_png(pixels)
}

/// Draw intensity against deflection angle for the four curves. Non-finite
/// caustic markers are dropped from the series.
fn render_intensity_chart(scan: &RainbowScan, intensities: [&[f64]; 4]) -> Result<String> {
    let angle_sets: [&[f64]; 4] = [
        &scan.primary_red,
        &scan.primary_purple,
        &scan.secondary_red,
        &scan.secondary_purple,
    ];
    let styles: [ShapeStyle; 4] = [
        RED.mix(0.85).stroke_width(2),
        MAGENTA.mix(0.85).stroke_width(2),
        RED.mix(0.85).stroke_width(2),
        MAGENTA.mix(0.85).stroke_width(2),
    ];
    let (x_lo, x_hi) = finite_bounds(angle_sets.iter().flat_map(|angles| angles.iter().copied()));
    let (y_lo, y_hi) = finite_bounds(intensities.iter().flat_map(|curve| curve.iter().copied()));
    let x_pad = 0.05 * (x_hi - x_lo).max(1e-9);
    let y_pad = 0.05 * (y_hi - y_lo).max(1e-9);

    let mut pixels = vec![0u8; (W * H * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (W, H)).into_drawing_area();
        root.fill(&WHITE).map_err(io::Error::other)?;
        let mut chart = ChartBuilder::on(&root)
            .caption("I(phi), red and purple", ("sans-serif", 20).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d((x_lo - x_pad)..(x_hi + x_pad), (y_lo - y_pad)..(y_hi + y_pad))
            .map_err(io::Error::other)?;
        chart.configure_mesh().draw().map_err(io::Error::other)?;
        for (angles, (curve, style)) in angle_sets.iter().zip(intensities.iter().zip(styles)) {
            chart
                .draw_series(LineSeries::new(
                    angles
                        .iter()
                        .copied()
                        .zip(curve.iter().copied())
                        .filter(|(_, intensity)| intensity.is_finite()),
                    style,
                ))
                .map_err(io::Error::other)?;
        }
        root.present().map_err(io::Error::other)?;
    }
    encode_png(pixels)
}

fn finite_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for value in values {
        if value.is_finite() {
            lo = lo.min(value);
            hi = hi.max(value);
        }
    }
    if lo > hi {
        (0.0, 1.0)
    } else {
        (lo, hi)
    }
}

/// Encode an RGB pixel buffer as a PNG data URL.
fn encode_png(pixels: Vec<u8>) -> Result<String> {
    let buffer = image::ImageBuffer::from_raw(W, H, pixels)
        .ok_or_else(|| io::Error::other("pixel buffer does not match chart dimensions"))?;
    let dynamic_image = image::DynamicImage::ImageRgb8(buffer);
    let mut png_buffer = Cursor::new(Vec::new());
    dynamic_image
        .write_to(&mut png_buffer, ImageFormat::Png)
        .map_err(|err| io::Error::other(err.to_string()))?;
    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png_buffer.into_inner())
    ))
}
