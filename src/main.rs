use bilsem_voice::audio::AudioOutput;
use bilsem_voice::{Config, GeminiClient, SpeechDispatcher, phrases};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

// 终端输入命令
#[derive(Debug, PartialEq)]
enum Command<'a> {
    Speak(&'a str),
    Preload(&'a str),
    Stars(u32),
    Resume,
    Suspend,
    Stop,
    Stats,
    Quit,
}

fn parse_command(line: &str) -> Option<Command<'_>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if !line.starts_with(':') {
        return (!line.trim().is_empty()).then_some(Command::Speak(line));
    }
    let (name, arg) = line.split_once(' ').unwrap_or((line, ""));
    match name {
        ":preload" => Some(Command::Preload(arg)),
        ":stars" => arg.trim().parse().ok().map(Command::Stars),
        ":resume" => Some(Command::Resume),
        ":suspend" => Some(Command::Suspend),
        ":stop" => Some(Command::Stop),
        ":stats" => Some(Command::Stats),
        ":quit" => Some(Command::Quit),
        _ => None,
    }
}

#[cfg(feature = "alsa-output")]
fn create_output(config: &Config) -> Arc<dyn AudioOutput> {
    use bilsem_voice::audio::{AlsaConfig, AlsaOutput};
    Arc::new(AlsaOutput::new(
        AlsaConfig {
            device: config.playback_device.to_string(),
            period_size: config.period_size(),
        },
        config.playback_start_suspended,
    ))
}

#[cfg(not(feature = "alsa-output"))]
fn create_output(config: &Config) -> Arc<dyn AudioOutput> {
    log::warn!("Built without alsa-output, playback is silent");
    Arc::new(bilsem_voice::NullOutput::new(config.playback_start_suspended))
}

fn speak_in_background(dispatcher: &SpeechDispatcher, text: String) {
    let dispatcher = dispatcher.clone();
    tokio::spawn(async move {
        dispatcher.speak(&text).await;
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::init();

    // 加载配置
    let config = Config::load().map_err(anyhow::Error::msg)?;
    if !config.has_api_key() {
        log::warn!("GEMINI_API_KEY is not set, every utterance will stay silent");
    }

    let client = Arc::new(GeminiClient::from_config(&config)?);
    let output = create_output(&config);
    let dispatcher = SpeechDispatcher::new(client, output, config.speech());

    // 启动时在后台预加载常用语句
    phrases::preload_startup_phrases(&dispatcher);

    println!(
        "{} {} started. Type a line to speak it, :quit to exit.",
        config.app_name, config.app_version
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            // 监听 Ctrl+C 信号
            _ = signal::ctrl_c() => {
                println!("Received Ctrl+C, shutting down...");
                break;
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    // 每条语句单独一个任务，新输入会立即打断上一条
                    Some(Command::Speak(text)) => speak_in_background(&dispatcher, text.to_string()),
                    Some(Command::Preload(text)) => dispatcher.preload(text),
                    Some(Command::Stars(stars)) => {
                        speak_in_background(&dispatcher, phrases::completion_phrase(stars))
                    }
                    Some(Command::Resume) => dispatcher.resume_output(),
                    Some(Command::Suspend) => dispatcher.suspend_output(),
                    Some(Command::Stop) => dispatcher.stop(),
                    Some(Command::Stats) => {
                        println!(
                            "cached={} pending={} queued={} preloading={} generation={} output={:?}",
                            dispatcher.cached_count(),
                            dispatcher.pending_count(),
                            dispatcher.queued_count(),
                            dispatcher.is_preloading(),
                            dispatcher.current_generation(),
                            dispatcher.output_state(),
                        );
                    }
                    Some(Command::Quit) => break,
                    None => {
                        if !line.trim().is_empty() {
                            println!("Unknown command: {}", line);
                        }
                    }
                }
            }
        }
    }

    dispatcher.stop();
    Ok(())
}
