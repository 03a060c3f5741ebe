//! HTML5 target: encode the three browser formats and emit a demo page.

use std::path::Path;

use async_trait::async_trait;

use tx_av::Capture;
use tx_probe::VideoTrack;

use crate::context::StepContext;
use crate::step::Step;
use crate::steps::path_arg;

/// Encode MP4, WebM, and Ogg renditions of the source and write an HTML
/// page referencing all three.
pub struct Html5Suite;

pub fn mp4_args(out: &Path, source: &Path, vt: &VideoTrack, passlog: &Path) -> Vec<String> {
    let mut args = vec![
        "-i".into(),
        path_arg(source),
        "-f".into(),
        "mp4".into(),
        "-vcodec".into(),
        "libx264".into(),
        "-profile:v".into(),
        "high".into(),
    ];
    if vt.height % 2 == 1 {
        args.push("-s".into());
        args.push(format!("{}x{}", vt.width, vt.height + 1));
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

pub fn webm_args(out: &Path, source: &Path, vt: &VideoTrack, passlog: &Path) -> Vec<String> {
    let mut args = vec![
        "-i".into(),
        path_arg(source),
        "-threads".into(),
        "0".into(),
        "-vcodec".into(),
        "libvpx".into(),
    ];
    if vt.base.bitrate_kbps > 0 {
        args.push("-b:v".into());
        args.push(format!("{}k", vt.base.bitrate_kbps));
    }
    args.extend([
        "-passlogfile".into(),
        path_arg(passlog),
        "-y".into(),
        path_arg(out),
    ]);
    args
}

pub fn ogv_args(out: &Path, source: &Path, vt: &VideoTrack, passlog: &Path) -> Vec<String> {
    let mut args = vec!["-i".into(), path_arg(source), "-threads".into(), "0".into()];
    if vt.base.bitrate_kbps > 0 {
        args.push("-b:v".into());
        args.push(format!("{}k", vt.base.bitrate_kbps));
    }
    args.extend([
        "-passlogfile".into(),
        path_arg(passlog),
        "-y".into(),
        path_arg(out),
    ]);
    args
}

pub fn video_page(base_name: &str) -> String {
    format!(
        concat!(
            "<!doctype html>\n",
            "<html>\n",
            "  <header>\n",
            "    <title>Video Demo</title>\n",
            "  </header>\n",
            "  <body>\n",
            "    <video controls=\"true\" width=\"640\" height=\"400\" autoplay=\"autoplay\">\n",
            "      <source src=\"{base}.mp4\" type=\"video/mp4\"/>\n",
            "      <source src=\"{base}.webm\" type=\"video/webm\"/>\n",
            "      <source src=\"{base}.ogv\" type=\"video/ogg\"/>\n",
            "      Your browser does not support the video tag.\n",
            "    </video>\n",
            "  </body>\n",
            "</html>\n",
        ),
        base = base_name
    )
}

#[async_trait]
impl Step for Html5Suite {
    fn name(&self) -> &'static str {
        "encode browser formats"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let Some(vt) = ctx.video() else {
            return Err(tx_core::Error::pipeline(self.name(), "no video track selected"));
        };
        let vt = vt.clone();
        let source = ctx.workspace.input().to_path_buf();

        let renditions = [
            (ctx.output_path(".mp4"), "encoding mp4 rendition"),
            (ctx.output_path(".webm"), "encoding webm rendition"),
            (ctx.output_path(".ogv"), "encoding ogg rendition"),
        ];
        for (i, (out, message)) in renditions.iter().enumerate() {
            let passlog = ctx.workspace.temp_file(&format!("ffmpeg2pass-{i}"));
            let args = match i {
                0 => mp4_args(out, &source, &vt, &passlog),
                1 => webm_args(out, &source, &vt, &passlog),
                _ => ogv_args(out, &source, &vt, &passlog),
            };
            let ok = ctx.run_tool("ffmpeg", args, Capture::Stderr, message).await?;
            if !ok {
                return Err(tx_core::Error::pipeline(self.name(), format!("{message} failed")));
            }
        }

        let page = ctx.output_path(".html");
        std::fs::write(&page, video_page(&ctx.base_name))
            .map_err(|e| tx_core::Error::pipeline(self.name(), e.to_string()))?;

        ctx.output_file = Some(page);
        Ok(())
    }
}
