//! Interactive prompt for calling Pixy procedures by name.
//!
//! Arguments are written as `type:value`, for example
//! `cam_setBrightness u8:128` or `rcs_setPos u8:0 u16:500`.

use log::warn;
use pixy_usb::{protocol::Value, Pixy, PixyConfig, PixyError};
use rustyline::{error::ReadlineError, DefaultEditor};

fn parse_arg(arg: &str) -> Result<Value, String> {
    let (ty, value) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected type:value, got {:?}", arg))?;

    let bad = |_| format!("invalid {} value {:?}", ty, value);

    Ok(match ty {
        "u8" => Value::U8(value.parse().map_err(bad)?),
        "u16" => Value::U16(value.parse().map_err(bad)?),
        "u32" => Value::U32(value.parse().map_err(bad)?),
        "i8" => Value::I8(value.parse().map_err(bad)?),
        "i16" => Value::I16(value.parse().map_err(bad)?),
        "i32" => Value::I32(value.parse().map_err(bad)?),
        "str" => Value::from(value),
        _ => return Err(format!("unknown type {:?}", ty)),
    })
}

#[tokio::main]
async fn main() -> Result<(), PixyError> {
    simplelog::TermLogger::init(
        log::LevelFilter::Warn,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )
    .unwrap();

    let pixy = Pixy::init(PixyConfig::default()).await?;
    let mut editor = DefaultEditor::new().unwrap();

    println!("Connected. Type a procedure name followed by arguments, `procs` to list procedures, or `quit`.");

    loop {
        let line = match editor.readline("pixy> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => {
                warn!("readline failed: {}", err);
                break;
            }
        };
        _ = editor.add_history_entry(line.as_str());

        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            continue;
        };

        match name {
            "quit" | "exit" => break,
            "procs" => {
                let mut names: Vec<_> = pixy.procedures().names().collect();
                names.sort_unstable();
                for name in names {
                    println!("  {}", name);
                }
                continue;
            }
            _ => {}
        }

        let args = match words.map(parse_arg).collect::<Result<Vec<_>, _>>() {
            Ok(args) => args,
            Err(err) => {
                println!("{}", err);
                continue;
            }
        };

        match pixy.call(name, args).await {
            Ok(values) => println!("{:?}", values),
            Err(err) => println!("error {}: {}", err.code(), err),
        }
    }

    pixy.close().await;
    Ok(())
}
