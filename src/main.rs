//! Command-line query runner for netconfd
//!
//! Loads a configuration XML file into an in-memory running datastore and
//! issues a single `<get>`/`<get-config>` against it, printing the reply.

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration XML file loaded into the running datastore
    #[arg(short, long)]
    config: String,

    /// XPath select expression
    #[arg(short, long)]
    xpath: Option<String>,

    /// Namespace binding for the XPath, as prefix=uri (repeatable)
    #[arg(short, long)]
    namespace: Vec<String>,

    /// Issue <get> instead of <get-config>
    #[arg(short, long)]
    state: bool,

    /// Content class for <get>: config, nonconfig or all
    #[arg(long)]
    content: Option<String>,

    /// Depth bound for the reply
    #[arg(short, long)]
    depth: Option<i32>,

    /// With-defaults mode: report-all, explicit, trim or report-all-tagged
    #[arg(short, long)]
    with_defaults: Option<String>,

    /// Engine options JSON file
    #[arg(short, long)]
    options: Option<String>,
}

#[cfg(feature = "cli")]
fn build_request(args: &Args) -> String {
    let mut filter = String::new();
    if let Some(ref xpath) = args.xpath {
        let mut decls = String::new();
        for binding in &args.namespace {
            if let Some((prefix, uri)) = binding.split_once('=') {
                decls.push_str(&format!(" xmlns:{}=\"{}\"", prefix, uri));
            }
        }
        filter = format!("<filter type=\"xpath\" select=\"{}\"{}/>", xpath, decls);
    }
    let with_defaults = args
        .with_defaults
        .as_ref()
        .map(|m| format!("<with-defaults>{}</with-defaults>", m))
        .unwrap_or_default();
    let depth = args
        .depth
        .map(|d| format!(" depth=\"{}\"", d))
        .unwrap_or_default();
    if args.state {
        let content = args
            .content
            .as_ref()
            .map(|c| format!(" content=\"{}\"", c))
            .unwrap_or_default();
        format!(
            "<rpc message-id=\"1\" xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
             <get{}{}>{}{}</get></rpc>",
            content, depth, filter, with_defaults
        )
    } else {
        format!(
            "<rpc message-id=\"1\" xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
             <get-config{}><source><running/></source>{}{}</get-config></rpc>",
            depth, filter, with_defaults
        )
    }
}

#[cfg(feature = "cli")]
fn run(args: Args) -> netconfd::Result<()> {
    use netconfd::datastore::MemDatastore;
    use netconfd::handler::{QueryHandler, Session};
    use netconfd::options::EngineOptions;
    use netconfd::schema::SchemaRegistry;

    let config = std::fs::read_to_string(&args.config)?;
    let mut datastore = MemDatastore::new();
    datastore.load("running", &config)?;

    let options = match args.options {
        Some(ref path) => EngineOptions::from_file(path)?,
        None => EngineOptions::default(),
    };

    let handler =
        QueryHandler::new(SchemaRegistry::new(), Box::new(datastore)).with_options(options);
    let request = build_request(&args);
    let reply = handler.dispatch(&Session::new(1, "cli"), &request)?;
    println!("{}", reply);
    Ok(())
}

#[cfg(feature = "cli")]
fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("netconfd: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
