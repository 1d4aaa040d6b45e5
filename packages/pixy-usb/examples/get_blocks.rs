use std::time::Duration;

use log::{error, info};
use pixy_usb::{Pixy, PixyConfig, PixyError};
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<(), PixyError> {
    simplelog::TermLogger::init(
        log::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )
    .unwrap();

    let pixy = Pixy::init(PixyConfig::default()).await?;

    let version = pixy.get_firmware_version().await?;
    info!("Pixy firmware {}", version);

    let mut frame = 0;
    loop {
        if !pixy.blocks_are_new() {
            if !pixy.is_connected() {
                error!("Pixy disconnected");
                break;
            }
            sleep(Duration::from_millis(20)).await;
            continue;
        }

        let blocks = match pixy.get_blocks(100) {
            Ok(blocks) => blocks,
            Err(err) => {
                error!("get_blocks failed: {} ({})", err, err.code());
                break;
            }
        };

        if frame % 50 == 0 {
            info!("frame {}:", frame);
            for (i, block) in blocks.iter().enumerate() {
                info!(
                    "  block {}: {:?} sig: {} x: {} y: {} width: {} height: {} angle: {}",
                    i,
                    block.kind,
                    block.signature,
                    block.x,
                    block.y,
                    block.width,
                    block.height,
                    block.angle
                );
            }
        }
        frame += 1;
    }

    info!("{} blocks dropped while polling", pixy.dropped_blocks());
    pixy.close().await;

    Ok(())
}
