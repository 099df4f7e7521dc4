use std::error::Error;
use std::path::PathBuf;
use structopt::StructOpt;
use kan_model::KanModel;

use log::info;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "kan-classify",
    about = "CLI app to run the Kan AI image classifier locally"
)]
struct CmdArgs {
    #[structopt(
        long,
        parse(from_os_str),
        help = "Saved model to load; a fresh network is built when it does not exist"
    )]
    model: Option<PathBuf>,

    #[structopt(long, parse(from_os_str), help = "Write the network to this path")]
    save: Option<PathBuf>,

    #[structopt(long, help = "Print the layer summary")]
    summary: bool,

    #[structopt(parse(from_os_str), help = "Image file to classify")]
    image: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CmdArgs::from_args();

    let model = KanModel::new(args.model.as_deref())?;
    info!("Kan AI Model ready!");

    if args.summary {
        if let Some(network) = model.network() {
            print!("{}", network.summary());
        }
    }

    if let Some(image) = args.image {
        let bytes = std::fs::read(&image)?;
        let prediction = model.predict(&bytes)?;

        println!("{}", serde_json::to_string(&prediction)?);
    }

    if let Some(path) = args.save {
        model.save(&path)?;
    }

    Ok(())
}
