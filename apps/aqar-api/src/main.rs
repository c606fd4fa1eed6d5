use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = aqar_api::Args::parse();

	aqar_api::run(args).await
}
