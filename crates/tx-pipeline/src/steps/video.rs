//! Video copy/recode steps driving the two recode tools.
//!
//! Argument construction is split into plain functions taking the track
//! metadata so each command line can be unit-tested.

use std::path::Path;

use async_trait::async_trait;

use tx_av::Capture;
use tx_core::media::{codec, working_extension};
use tx_probe::VideoTrack;
use tx_rules::DeviceProfile;

use crate::context::StepContext;
use crate::step::Step;
use crate::steps::path_arg;

/// Default video bitrate (kbps) when the probe reported none.
const DEFAULT_RECODE_BITRATE: u32 = 10000;

/// Bitrate floor applied wherever a device cap is in play.
const MIN_BITRATE: u32 = 640;

// ---- Elementary copy (legacy containers) ----

/// Copy the video stream out of an elementary-stream container unchanged.
pub struct CopyVideoElementary;

pub fn copy_video_args(out: &Path, source: &Path) -> Vec<String> {
    vec![
        "-o".into(),
        path_arg(out),
        "-nosound".into(),
        "-of".into(),
        "rawvideo".into(),
        "-ovc".into(),
        "copy".into(),
        path_arg(source),
    ]
}

#[async_trait]
impl Step for CopyVideoElementary {
    fn name(&self) -> &'static str {
        "copy video"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let Some(vt) = ctx.video() else {
            return Err(tx_core::Error::pipeline(self.name(), "no video track selected"));
        };
        let out = ctx
            .workspace
            .temp_file(&format!("video{}", working_extension(&vt.base.codec_id)));
        let args = copy_video_args(&out, ctx.workspace.input());

        let ok = ctx
            .run_tool("mencoder", args, Capture::Stdout, "copying video track")
            .await?;
        if !ok {
            return Err(tx_core::Error::pipeline(self.name(), "video copy failed"));
        }

        if let Some(vt) = ctx.video_mut() {
            vt.base.working_file = Some(out);
        }
        Ok(())
    }
}

// ---- Console H.264 recode (elementary stream output) ----

/// Recode the video track to baseline-compatible H.264 as an elementary
/// stream, optionally burning in the selected subtitle track.
pub struct RecodeVideoH264 {
    pub burn_subtitles: bool,
}

pub fn recode_h264_args(
    out: &Path,
    source: &Path,
    bitrate_kbps: u32,
    max_ref_frames: u32,
    subtitle: Option<&Path>,
) -> Vec<String> {
    let mut args = vec![
        "-o".into(),
        path_arg(out),
        "-nosound".into(),
        "-ovc".into(),
        "x264".into(),
        "-x264encopts".into(),
        format!("bitrate={bitrate_kbps}:frameref={max_ref_frames}:bframes=3:b_pyramid:threads=auto"),
        "-lavdopts".into(),
        "threads=2".into(),
        "-noskip".into(),
        "-mc".into(),
        "0".into(),
        "-ofps".into(),
        "24000/1001".into(),
        "-fps".into(),
        "24000/1001".into(),
        path_arg(source),
    ];
    if let Some(sub) = subtitle {
        args.push("-sub".into());
        args.push(path_arg(sub));
        args.push("-subpos".into());
        args.push("99".into());
    }
    args
}

#[async_trait]
impl Step for RecodeVideoH264 {
    fn name(&self) -> &'static str {
        "recode video"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        // The recode emits H.264; relabel before deriving the stream name.
        let Some(vt) = ctx.video_mut() else {
            return Err(tx_core::Error::pipeline("recode video", "no video track selected"));
        };
        vt.base.codec_id = codec::H264.to_string();
        let bitrate = if vt.base.bitrate_kbps > 0 {
            vt.base.bitrate_kbps
        } else {
            DEFAULT_RECODE_BITRATE
        };
        let max_ref = vt.max_ref_frames;

        let out = ctx
            .workspace
            .temp_file(&format!("video{}", working_extension(codec::H264)));
        let subtitle = if self.burn_subtitles {
            ctx.subtitle().and_then(|s| s.base.working_file.clone())
        } else {
            None
        };
        let args = recode_h264_args(
            &out,
            ctx.workspace.input(),
            bitrate,
            max_ref,
            subtitle.as_deref(),
        );

        let ok = ctx
            .run_tool("mencoder", args, Capture::Stdout, "recoding video track")
            .await?;
        if !ok {
            return Err(tx_core::Error::pipeline(self.name(), "video recode failed"));
        }

        if let Some(vt) = ctx.video_mut() {
            vt.base.working_file = Some(out);
        }
        Ok(())
    }
}

// ---- Single-pass container recode to MP4 (console, unknown containers) ----

/// Recode an arbitrary container straight to an MP4 in the output folder.
pub struct ContainerRecodeMp4;

pub fn container_recode_args(out: &Path, source: &Path, bitrate_kbps: u32, fps: f64) -> Vec<String> {
    vec![
        "-o".into(),
        path_arg(out),
        "-vf".into(),
        "harddup".into(),
        "-of".into(),
        "lavf".into(),
        "-lavfopts".into(),
        "format=mp4".into(),
        "-oac".into(),
        "faac".into(),
        "-faacopts".into(),
        "mpeg=4:object=2:raw:br=160".into(),
        "-ovc".into(),
        "x264".into(),
        "-sws".into(),
        "9".into(),
        "-x264encopts".into(),
        format!("nocabac:level_idc=41:bframes=0:global_header:threads=auto:subq=5:frameref=4:partitions=all:trellis=1:chroma_me:me=umh:bitrate={bitrate_kbps}"),
        "-ofps".into(),
        format!("{fps}"),
        path_arg(source),
    ]
}

#[async_trait]
impl Step for ContainerRecodeMp4 {
    fn name(&self) -> &'static str {
        "recode container"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let Some(vt) = ctx.video() else {
            return Err(tx_core::Error::pipeline(self.name(), "no video track selected"));
        };
        let bitrate = vt.base.bitrate_kbps.max(MIN_BITRATE);
        let fps = vt.frame_rate;
        let out = ctx.output_path(".mp4");
        let args = container_recode_args(&out, ctx.workspace.input(), bitrate, fps);

        let ok = ctx
            .run_tool("mencoder", args, Capture::Stdout, "recoding video track")
            .await?;
        if !ok {
            return Err(tx_core::Error::pipeline(self.name(), "recode failed"));
        }
        ctx.output_file = Some(out);
        Ok(())
    }
}

// ---- Phone/tablet MP4 recode ----

/// Recode to a phone/tablet MP4 capped at 2000 kbps, downscaling to the
/// device width when the source is wider.
pub struct PhoneRecodeMp4 {
    /// Source is the multi-track container (select the audio stream by id,
    /// skip the output-fps pin).
    pub from_mkv: bool,
}

pub fn phone_recode_args(
    out: &Path,
    source: &Path,
    vt: &VideoTrack,
    device: &DeviceProfile,
    audio_id: Option<u32>,
    from_mkv: bool,
) -> Vec<String> {
    let bitrate = vt.base.bitrate_kbps.clamp(MIN_BITRATE, 2000);

    let mut args = vec!["-o".into(), path_arg(out)];
    if let Some(aid) = audio_id {
        args.push("-aid".into());
        args.push(aid.to_string());
    }
    args.push("-vf".into());
    if device.max_width > 0 && vt.width > device.max_width as u32 {
        args.push(format!("scale={}:-10,harddup", device.max_width));
    } else {
        args.push("harddup".into());
    }
    args.extend([
        "-of".into(),
        "lavf".into(),
        "-lavfopts".into(),
        "format=mp4".into(),
        "-oac".into(),
        "faac".into(),
        "-faacopts".into(),
        "mpeg=4:object=2:raw:br=128".into(),
        "-channels".into(),
        "2".into(),
        "-srate".into(),
        "48000".into(),
        "-ovc".into(),
        "x264".into(),
        "-sws".into(),
        "9".into(),
        "-x264encopts".into(),
        format!("nocabac:level_idc=30:bframes=0:global_header:threads=auto:subq=5:frameref=6:partitions=all:trellis=1:chroma_me:me=umh:bitrate={bitrate}"),
        "-mc".into(),
        "0".into(),
        "-noskip".into(),
    ]);
    if !from_mkv {
        args.push("-ofps".into());
        args.push(format!("{}", vt.frame_rate));
    }
    args.push(path_arg(source));
    args
}

#[async_trait]
impl Step for PhoneRecodeMp4 {
    fn name(&self) -> &'static str {
        "recode for device"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let Some(vt) = ctx.video() else {
            return Err(tx_core::Error::pipeline(self.name(), "no video track selected"));
        };
        let audio_id = if self.from_mkv {
            ctx.audio().map(|a| a.audio_index)
        } else {
            None
        };
        let out = ctx.output_path(".mp4");
        let args = phone_recode_args(
            &out,
            ctx.workspace.input(),
            vt,
            ctx.device,
            audio_id,
            self.from_mkv,
        );

        let ok = ctx
            .run_tool("mencoder", args, Capture::Stdout, "recoding for device")
            .await?;
        if !ok {
            return Err(tx_core::Error::pipeline(self.name(), "recode failed"));
        }
        ctx.output_file = Some(out);
        Ok(())
    }
}

// ---- Media-console MP4 remux/recode from the multi-track container ----

/// Repackage the multi-track container as MP4 with stereo AAC audio,
/// copying the video stream when it already fits the device.
pub struct XboxRemuxMp4;

pub fn xbox_remux_args(
    out: &Path,
    source: &Path,
    vt: &VideoTrack,
    audio_id: Option<u32>,
) -> Vec<String> {
    let mut args = vec!["-o".into(), path_arg(out)];
    if let Some(aid) = audio_id {
        args.push("-aid".into());
        args.push(aid.to_string());
    }
    args.extend([
        "-vf".into(),
        "harddup".into(),
        "-of".into(),
        "lavf".into(),
        "-lavfopts".into(),
        "format=mp4".into(),
        "-oac".into(),
        "faac".into(),
        "-faacopts".into(),
        "mpeg=4:object=2:raw:br=320".into(),
        "-channels".into(),
        "2".into(),
        "-srate".into(),
        "48000".into(),
    ]);
    if vt.base.requires_recode {
        let bitrate = if vt.base.bitrate_kbps > 0 {
            vt.base.bitrate_kbps
        } else {
            8000
        };
        args.extend([
            "-ovc".into(),
            "x264".into(),
            "-sws".into(),
            "9".into(),
            "-x264encopts".into(),
            format!("nocabac:level_idc=41:bframes=0:global_header:threads=auto:subq=5:frameref={}:partitions=all:trellis=1:chroma_me:me=umh:bitrate={bitrate}", vt.max_ref_frames),
            "-mc".into(),
            "0".into(),
            "-noskip".into(),
        ]);
    } else {
        args.push("-ovc".into());
        args.push("copy".into());
    }
    args.push(path_arg(source));
    args
}

#[async_trait]
impl Step for XboxRemuxMp4 {
    fn name(&self) -> &'static str {
        "repackage for console"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let Some(vt) = ctx.video() else {
            return Err(tx_core::Error::pipeline(self.name(), "no video track selected"));
        };
        let audio_id = ctx.audio().map(|a| a.audio_index);
        let out = ctx.output_path(".mp4");
        let args = xbox_remux_args(&out, ctx.workspace.input(), vt, audio_id);

        let ok = ctx
            .run_tool("mencoder", args, Capture::Stdout, "repackaging for console")
            .await?;
        if !ok {
            return Err(tx_core::Error::pipeline(self.name(), "repackage failed"));
        }
        ctx.output_file = Some(out);
        Ok(())
    }
}

// ---- General transcoder two-pass recodes ----

/// Clamp the target bitrate to `[MIN_BITRATE, device cap]`.
fn device_bitrate(vt: &VideoTrack, device: &DeviceProfile) -> u32 {
    let mut bitrate = if vt.base.bitrate_kbps > 0 {
        vt.base.bitrate_kbps
    } else {
        2000
    };
    if bitrate < MIN_BITRATE {
        bitrate = MIN_BITRATE;
    }
    if let Some(cap) = device.bitrate_cap() {
        bitrate = bitrate.min(cap);
    }
    bitrate
}

/// Round an odd height up to even (the transcoder rejects odd dimensions),
/// then clamp to the device maximum.
fn target_height(vt: &VideoTrack, device: &DeviceProfile) -> u32 {
    let mut height = vt.height;
    if height % 2 == 1 {
        height += 1;
    }
    if device.max_height > 0 && height > device.max_height as u32 {
        height = device.max_height as u32;
    }
    height
}

/// Two-pass H.264/HEVC recode tuned to the device caps, via the general
/// transcoder.
pub struct DeviceTwoPassRecode {
    pub hevc: bool,
}

pub fn device_two_pass_args(
    out: &Path,
    source: &Path,
    vt: &VideoTrack,
    device: &DeviceProfile,
    hevc: bool,
    pass: u8,
    passlog: &Path,
) -> Vec<String> {
    let mut args = vec![
        "-i".into(),
        path_arg(source),
        "-pass".into(),
        pass.to_string(),
    ];
    if hevc {
        args.push("-vcodec".into());
        args.push("libx265".into());
    } else {
        args.extend(["-vcodec".into(), "libx264".into(), "-profile:v".into(), "high".into()]);
    }
    args.push("-r".into());
    args.push(format!("{}", vt.frame_rate));
    args.push("-b:v".into());
    args.push(format!("{}k", device_bitrate(vt, device)));

    let height = target_height(vt, device);
    if height != vt.height {
        args.push("-vf".into());
        args.push(format!("scale=-1:{height}"));
    }

    args.extend([
        "-threads".into(),
        "0".into(),
        "-acodec".into(),
        "aac".into(),
        "-ac".into(),
        "2".into(),
        "-b:a".into(),
        "320k".into(),
        "-passlogfile".into(),
        path_arg(passlog),
        "-y".into(),
        path_arg(out),
    ]);
    args
}

#[async_trait]
impl Step for DeviceTwoPassRecode {
    fn name(&self) -> &'static str {
        if self.hevc {
            "two-pass recode hevc"
        } else {
            "two-pass recode"
        }
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let Some(vt) = ctx.video() else {
            return Err(tx_core::Error::pipeline(self.name(), "no video track selected"));
        };
        let vt = vt.clone();
        let out = ctx.output_path(".mp4");
        let passlog = ctx.workspace.temp_file("ffmpeg2pass");

        for pass in 1..=2u8 {
            let args =
                device_two_pass_args(&out, ctx.workspace.input(), &vt, ctx.device, self.hevc, pass, &passlog);
            let message = if pass == 1 {
                "recoding video track (pass 1)"
            } else {
                "recoding video track (pass 2)"
            };
            let ok = ctx.run_tool("ffmpeg", args, Capture::Stderr, message).await?;
            if !ok {
                return Err(tx_core::Error::pipeline(self.name(), "recode failed"));
            }
        }

        cleanup_pass_logs(ctx, &passlog);
        ctx.output_file = Some(out);
        Ok(())
    }
}

/// Legacy-codec sources: two-pass H.264 recode preserving the frame rate,
/// with the audio either copied or converted to AC-3.
pub struct LegacyTwoPassRecode {
    /// Output extension including the dot (".flv" for the flash-video
    /// source, ".mkv" for legacy windows-media).
    pub output_extension: &'static str,
    pub audio: LegacyAudio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyAudio {
    Copy,
    Ac3,
}

pub fn legacy_two_pass_args(
    out: &Path,
    source: &Path,
    vt: &VideoTrack,
    audio: LegacyAudio,
    pass: u8,
    passlog: &Path,
) -> Vec<String> {
    let mut args = vec![
        "-i".into(),
        path_arg(source),
        "-pass".into(),
        pass.to_string(),
        "-vcodec".into(),
        "libx264".into(),
        "-profile:v".into(),
        "high".into(),
        "-r".into(),
        format!("{}", vt.frame_rate),
    ];
    if vt.base.bitrate_kbps > 0 {
        args.push("-b:v".into());
        args.push(format!("{}k", vt.base.bitrate_kbps));
    }
    if vt.height % 2 == 1 {
        args.push("-s".into());
        args.push(format!("{}x{}", vt.width, vt.height + 1));
    }
    args.extend(["-threads".into(), "0".into(), "-acodec".into()]);
    args.push(match audio {
        LegacyAudio::Copy => "copy".into(),
        LegacyAudio::Ac3 => "ac3".into(),
    });
    args.extend([
        "-passlogfile".into(),
        path_arg(passlog),
        "-y".into(),
        path_arg(out),
    ]);
    args
}

#[async_trait]
impl Step for LegacyTwoPassRecode {
    fn name(&self) -> &'static str {
        "recode legacy codec"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let Some(vt) = ctx.video() else {
            return Err(tx_core::Error::pipeline(self.name(), "no video track selected"));
        };
        let vt = vt.clone();
        let out = ctx.output_path(self.output_extension);
        let passlog = ctx.workspace.temp_file("ffmpeg2pass");

        for pass in 1..=2u8 {
            let args = legacy_two_pass_args(&out, ctx.workspace.input(), &vt, self.audio, pass, &passlog);
            let message = if pass == 1 {
                "recoding video track (pass 1)"
            } else {
                "recoding video track (pass 2)"
            };
            let ok = ctx.run_tool("ffmpeg", args, Capture::Stderr, message).await?;
            if !ok {
                return Err(tx_core::Error::pipeline(self.name(), "recode failed"));
            }
        }

        cleanup_pass_logs(ctx, &passlog);
        ctx.output_file = Some(out);
        Ok(())
    }
}

fn cleanup_pass_logs(ctx: &mut StepContext, passlog: &Path) {
    let log = passlog.with_file_name(format!(
        "{}-0.log",
        passlog.file_name().unwrap_or_default().to_string_lossy()
    ));
    let mbtree = passlog.with_file_name(format!(
        "{}-0.log.mbtree",
        passlog.file_name().unwrap_or_default().to_string_lossy()
    ));
    ctx.consume_working_file(&log);
    ctx.consume_working_file(&mbtree);
}

// ---- Single-pass quicktime recode ----

/// Single-pass recode of a quicktime source to MP4 with a baseline
/// profile, downscaling anything above 1080 lines.
pub struct MovRecodeMp4;

pub fn mov_recode_args(out: &Path, source: &Path, original_height: u32) -> Vec<String> {
    let mut args = vec![
        "-i".into(),
        path_arg(source),
        "-f".into(),
        "mp4".into(),
        "-vcodec".into(),
        "libx264".into(),
        "-profile:v".into(),
        "baseline".into(),
    ];
    if original_height > 1080 {
        args.push("-s".into());
        args.push("1920x1080".into());
    }
    args.extend([
        "-acodec".into(),
        "aac".into(),
        "-ac".into(),
        "2".into(),
        "-b:a".into(),
        "320k".into(),
        "-y".into(),
        path_arg(out),
    ]);
    args
}

#[async_trait]
impl Step for MovRecodeMp4 {
    fn name(&self) -> &'static str {
        "recode quicktime"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let Some(vt) = ctx.video() else {
            return Err(tx_core::Error::pipeline(self.name(), "no video track selected"));
        };
        let out = ctx.output_path(".mp4");
        let args = mov_recode_args(&out, ctx.workspace.input(), vt.original_height);

        let ok = ctx
            .run_tool("ffmpeg", args, Capture::Stderr, "recoding video track")
            .await?;
        if !ok {
            return Err(tx_core::Error::pipeline(self.name(), "recode failed"));
        }
        ctx.output_file = Some(out);
        Ok(())
    }
}

// ---- Disc recode ----

/// Recode a disc folder (`dvd://` source) straight to MP4.
pub struct DvdRecodeMp4 {
    /// Phone targets get a fixed 640 kbps and a 640-wide downscale;
    /// console targets keep the source bitrate (floored at 6000).
    pub phone: bool,
}

pub fn dvd_recode_args(out: &Path, disc: &Path, vt: &VideoTrack, phone: bool) -> Vec<String> {
    let mut args = vec!["-o".into(), path_arg(out)];
    if phone {
        args.extend(["-vf".into(), "scale=640:-10,harddup".into()]);
    }
    args.extend([
        "-of".into(),
        "lavf".into(),
        "-lavfopts".into(),
        "format=mp4".into(),
        "-oac".into(),
        "faac".into(),
        "-faacopts".into(),
    ]);
    if phone {
        args.push("mpeg=4:object=2:raw:br=160".into());
    } else {
        args.push("mpeg=4:object=2:raw:br=320".into());
        args.extend(["-channels".into(), "2".into(), "-srate".into(), "48000".into()]);
    }

    let bitrate = if phone {
        MIN_BITRATE
    } else if vt.base.bitrate_kbps < MIN_BITRATE {
        6000
    } else {
        vt.base.bitrate_kbps
    };
    args.extend([
        "-ovc".into(),
        "x264".into(),
        "-sws".into(),
        "9".into(),
        "-x264encopts".into(),
        format!("nocabac:level_idc=30:bframes=0:global_header:threads=auto:subq=5:frameref=6:partitions=all:trellis=1:chroma_me:me=umh:bitrate={bitrate}"),
        "-mc".into(),
        "0".into(),
        "-noskip".into(),
    ]);
    if phone {
        args.push("-ofps".into());
        args.push(format!("{}", vt.frame_rate));
    }
    args.extend([
        "dvd://1".into(),
        "-dvd-device".into(),
        path_arg(disc),
    ]);
    args
}

#[async_trait]
impl Step for DvdRecodeMp4 {
    fn name(&self) -> &'static str {
        "recode disc"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let Some(vt) = ctx.video() else {
            return Err(tx_core::Error::pipeline(self.name(), "no video track selected"));
        };
        let vt = vt.clone();
        let out = ctx.output_path(".mp4");
        let args = dvd_recode_args(&out, ctx.workspace.input(), &vt, self.phone);

        let ok = ctx
            .run_tool("mencoder", args, Capture::Stdout, "recoding disc title")
            .await?;
        if !ok {
            return Err(tx_core::Error::pipeline(self.name(), "disc recode failed"));
        }
        ctx.output_file = Some(out);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tx_core::media::codec;
    use tx_probe::Track;
    use tx_rules::{DeviceCatalog, DeviceKind};

    fn video(width: u32, height: u32, bitrate: u32) -> VideoTrack {
        VideoTrack {
            base: Track {
                id: 1,
                codec_id: codec::H264.to_string(),
                bitrate_kbps: bitrate,
                ..Track::default()
            },
            width,
            height,
            original_height: height,
            frame_rate: 23.976,
            ..VideoTrack::default()
        }
    }

    #[test]
    fn recode_args_embed_bitrate_and_ref_budget() {
        let args = recode_h264_args(
            Path::new("/work/video.h264"),
            Path::new("/media/movie.mkv"),
            7500,
            4,
            None,
        );
        let encopts = args
            .iter()
            .find(|a| a.starts_with("bitrate="))
            .expect("x264 options present");
        assert_eq!(
            encopts,
            "bitrate=7500:frameref=4:bframes=3:b_pyramid:threads=auto"
        );
        assert!(!args.contains(&"-sub".to_string()));
    }

    #[test]
    fn subtitle_burn_in_appends_sub_args() {
        let args = recode_h264_args(
            Path::new("/work/video.h264"),
            Path::new("/media/movie.mkv"),
            7500,
            4,
            Some(Path::new("/work/subtitle2.srt")),
        );
        let pos = args.iter().position(|a| a == "-sub").unwrap();
        assert_eq!(args[pos + 1], "/work/subtitle2.srt");
        assert!(args.contains(&"-subpos".to_string()));
    }

    #[test]
    fn odd_height_rounds_up_to_even() {
        let device = DeviceCatalog::by_kind(DeviceKind::SamsungS4);
        let vt = video(1280, 721, 1800);
        assert_eq!(target_height(&vt, device), 722);
    }

    #[test]
    fn height_clamped_to_device_maximum() {
        let device = DeviceCatalog::by_kind(DeviceKind::SamsungS3);
        let vt = video(1920, 1080, 1800);
        assert_eq!(target_height(&vt, device), 720);
    }

    #[test]
    fn device_bitrate_clamps_both_ends() {
        let device = DeviceCatalog::by_kind(DeviceKind::SamsungS4);
        assert_eq!(device_bitrate(&video(1920, 1080, 100), device), 640);
        assert_eq!(device_bitrate(&video(1920, 1080, 9000), device), 2500);
        assert_eq!(device_bitrate(&video(1920, 1080, 1800), device), 1800);
    }

    #[test]
    fn unbounded_device_keeps_source_bitrate() {
        let device = DeviceCatalog::by_kind(DeviceKind::SamsungS5);
        assert_eq!(device_bitrate(&video(1920, 1080, 9000), device), 9000);
    }

    #[test]
    fn two_pass_args_switch_codec_for_hevc() {
        let device = DeviceCatalog::by_kind(DeviceKind::SamsungS5);
        let vt = video(1920, 1080, 1800);
        let args = device_two_pass_args(
            Path::new("/out/movie.mp4"),
            Path::new("/media/movie.mkv"),
            &vt,
            device,
            true,
            2,
            Path::new("/work/ffmpeg2pass"),
        );
        assert!(args.contains(&"libx265".to_string()));
        assert!(args.contains(&"2".to_string()));
        assert!(!args.contains(&"-profile:v".to_string()));
    }

    #[test]
    fn two_pass_scales_when_height_exceeds_cap() {
        let device = DeviceCatalog::by_kind(DeviceKind::SamsungS3);
        let vt = video(1920, 1080, 1800);
        let args = device_two_pass_args(
            Path::new("/out/movie.mp4"),
            Path::new("/media/movie.mkv"),
            &vt,
            device,
            false,
            1,
            Path::new("/work/ffmpeg2pass"),
        );
        assert!(args.contains(&"scale=-1:720".to_string()));
    }

    #[test]
    fn legacy_recode_fixes_odd_height() {
        let vt = video(640, 361, 900);
        let args = legacy_two_pass_args(
            Path::new("/out/movie.flv"),
            Path::new("/media/movie.flv"),
            &vt,
            LegacyAudio::Copy,
            1,
            Path::new("/work/ffmpeg2pass"),
        );
        let pos = args.iter().position(|a| a == "-s").unwrap();
        assert_eq!(args[pos + 1], "640x362");
        assert!(args.contains(&"copy".to_string()));
    }

    #[test]
    fn dvd_args_for_phone_downscale_and_floor_bitrate() {
        let vt = video(720, 576, 5000);
        let args = dvd_recode_args(Path::new("/out/DISC.mp4"), Path::new("/media/DISC"), &vt, true);
        assert!(args.contains(&"scale=640:-10,harddup".to_string()));
        assert!(args.iter().any(|a| a.contains("bitrate=640")));
        assert!(args.contains(&"dvd://1".to_string()));
    }

    #[test]
    fn xbox_copies_video_when_no_recode_needed() {
        let vt = video(1920, 1080, 8000);
        let args = xbox_remux_args(
            Path::new("/out/movie.mp4"),
            Path::new("/media/movie.mkv"),
            &vt,
            Some(1),
        );
        assert!(args.contains(&"copy".to_string()));
        assert!(!args.iter().any(|a| a.contains("bitrate=")));
    }
}
