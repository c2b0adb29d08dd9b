//! FFmpeg-based assembler implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::config::AssemblerConfig;
use super::error::AssemblerError;
use super::traits::Assembler;
use crate::metrics::{ASSEMBLIES_TOTAL, ASSEMBLY_DURATION, CLIP_DOWNLOADS};
use crate::plan::ClipRecord;

/// Downloads clips over HTTP and concatenates them with ffmpeg.
pub struct FfmpegAssembler {
    config: AssemblerConfig,
    client: Client,
}

impl FfmpegAssembler {
    pub fn new(config: AssemblerConfig) -> Result<Self, AssemblerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .build()
            .map_err(|e| AssemblerError::failed(format!("failed to create HTTP client: {}", e), None))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Per-input normalisation: letterbox to the target frame, square pixels,
    /// fixed frame rate.
    fn video_filter(&self, index: usize) -> String {
        let (w, h) = (self.config.width, self.config.height);
        format!(
            "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p[v{i}]",
            i = index,
            w = w,
            h = h,
            fps = self.config.fps
        )
    }

    fn build_filter_graph(&self, count: usize, with_audio: bool) -> String {
        let mut parts: Vec<String> = (0..count).map(|i| self.video_filter(i)).collect();
        if with_audio {
            parts.extend((0..count).map(|i| {
                format!(
                    "[{i}:a]aresample=44100,aformat=channel_layouts=stereo[a{i}]",
                    i = i
                )
            }));
        }

        let inputs: String = (0..count)
            .map(|i| {
                if with_audio {
                    format!("[v{i}][a{i}]", i = i)
                } else {
                    format!("[v{i}]", i = i)
                }
            })
            .collect();
        let concat = if with_audio {
            format!("{}concat=n={}:v=1:a=1[outv][outa]", inputs, count)
        } else {
            format!("{}concat=n={}:v=1:a=0[outv]", inputs, count)
        };
        parts.push(concat);
        parts.join(";")
    }

    /// Builds ffmpeg arguments for concatenating `inputs` into `output`.
    fn build_concat_args(&self, inputs: &[&Path], output: &Path, with_audio: bool) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];

        for input in inputs {
            args.push("-i".to_string());
            args.push(input.to_string_lossy().to_string());
        }

        args.push("-filter_complex".to_string());
        args.push(self.build_filter_graph(inputs.len(), with_audio));

        args.extend(["-map".to_string(), "[outv]".to_string()]);
        if with_audio {
            args.extend(["-map".to_string(), "[outa]".to_string()]);
        }

        args.extend([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            self.config.preset.clone(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ]);
        if with_audio {
            args.extend([
                "-c:a".to_string(),
                "aac".to_string(),
                "-b:a".to_string(),
                "128k".to_string(),
            ]);
        } else {
            args.push("-an".to_string());
        }

        args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        args.push(output.to_string_lossy().to_string());
        args
    }

    /// Parses `ffprobe -show_streams` JSON and reports whether an audio stream exists.
    fn parse_has_audio(output: &str) -> Result<bool, AssemblerError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
        }

        let probe: ProbeOutput = serde_json::from_str(output)
            .map_err(|e| AssemblerError::failed(format!("unreadable ffprobe output: {}", e), None))?;

        Ok(probe
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio")))
    }

    async fn has_audio(&self, path: &Path) -> Result<bool, AssemblerError> {
        let output = Command::new(&self.config.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AssemblerError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    AssemblerError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(AssemblerError::failed(
                format!("ffprobe failed on {}", path.display()),
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
            ));
        }

        Self::parse_has_audio(&String::from_utf8_lossy(&output.stdout))
    }

    /// Audio is kept only when every clip carries it. Probe failures count as silent.
    async fn all_have_audio(&self, clips: &[ClipRecord]) -> bool {
        for clip in clips {
            match self.has_audio(&clip.local_path).await {
                Ok(true) => {}
                Ok(false) => return false,
                Err(e) => {
                    warn!(path = %clip.local_path.display(), error = %e, "Probe failed, assembling without audio");
                    return false;
                }
            }
        }
        true
    }

    async fn run_ffmpeg(&self, args: &[String]) -> Result<(), AssemblerError> {
        let mut command = Command::new(&self.config.ffmpeg_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let timeout_secs = self.config.assembly_timeout_secs;
        let output = match timeout(Duration::from_secs(timeout_secs), command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AssemblerError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                })
            }
            Ok(Err(e)) => return Err(AssemblerError::Io(e)),
            // Dropping the future kills the child.
            Err(_) => return Err(AssemblerError::Timeout { timeout_secs }),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(AssemblerError::failed(
                format!("FFmpeg exited with code: {:?}", output.status.code()),
                if stderr.is_empty() { None } else { Some(stderr) },
            ));
        }
        Ok(())
    }

    async fn concat(&self, clips: &[ClipRecord], output: &Path) -> Result<(), AssemblerError> {
        let with_audio = self.all_have_audio(clips).await;
        let partial = output.with_extension("partial.mp4");
        let inputs: Vec<&Path> = clips.iter().map(|c| c.local_path.as_path()).collect();
        let args = self.build_concat_args(&inputs, &partial, with_audio);

        debug!(clips = clips.len(), with_audio, "Running ffmpeg concat");
        if let Err(e) = self.run_ffmpeg(&args).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }

        tokio::fs::rename(&partial, output).await?;
        Ok(())
    }

    async fn fetch(&self, url: &str, destination: &Path) -> Result<PathBuf, AssemblerError> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AssemblerError::download(url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(AssemblerError::download(
                url,
                format!("HTTP {}", response.status()),
            ));
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AssemblerError::download(url, e.to_string()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(AssemblerError::download(url, "empty response body"));
        }

        debug!(url = %url, bytes = written, "Clip downloaded");
        Ok(destination.to_path_buf())
    }
}

#[async_trait]
impl Assembler for FfmpegAssembler {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<PathBuf, AssemblerError> {
        let result = self.fetch(url, destination).await;
        match &result {
            Ok(_) => CLIP_DOWNLOADS.with_label_values(&["success"]).inc(),
            Err(e) => {
                CLIP_DOWNLOADS.with_label_values(&["failed"]).inc();
                let _ = tokio::fs::remove_file(destination).await;
                warn!(url = %url, error = %e, "Clip download failed");
            }
        }
        result
    }

    async fn assemble(
        &self,
        clips: &[ClipRecord],
        output: &Path,
    ) -> Result<PathBuf, AssemblerError> {
        if clips.is_empty() {
            return Err(AssemblerError::NoClips);
        }

        let mut ordered = clips.to_vec();
        ordered.sort_by_key(|c| c.stage_index);

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let start = Instant::now();
        let result = if let [single] = ordered.as_slice() {
            tokio::fs::copy(&single.local_path, output)
                .await
                .map(|_| ())
                .map_err(AssemblerError::Io)
        } else {
            self.concat(&ordered, output).await
        };
        ASSEMBLY_DURATION.observe(start.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                ASSEMBLIES_TOTAL.with_label_values(&["success"]).inc();
                info!(
                    clips = ordered.len(),
                    output = %output.display(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Final video assembled"
                );
                Ok(output.to_path_buf())
            }
            Err(e) => {
                ASSEMBLIES_TOTAL.with_label_values(&["failed"]).inc();
                Err(e)
            }
        }
    }

    async fn validate(&self) -> Result<(), AssemblerError> {
        for (path, missing) in [
            (
                &self.config.ffmpeg_path,
                AssemblerError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                },
            ),
            (
                &self.config.ffprobe_path,
                AssemblerError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                },
            ),
        ] {
            match Command::new(path).arg("-version").output().await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(missing),
                Err(e) => return Err(AssemblerError::Io(e)),
            }
        }
        Ok(())
    }
}
