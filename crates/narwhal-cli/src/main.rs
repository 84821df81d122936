use narwhal::layout::Positions;
use narwhal::{Graph, LayoutOptions, SimBox};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Read;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Layout(narwhal::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Layout(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<narwhal::Error> for CliError {
    fn from(value: narwhal::Error) -> Self {
        Self::Layout(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Layout,
    Validate,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    with_steps: bool,
    width: Option<f64>,
    height: Option<f64>,
}

/// Layout request: the graph, the simulation box and the `layoutAlgorithm` options.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutInput {
    #[serde(flatten)]
    graph: Graph,
    #[serde(rename = "box", default = "default_box")]
    area: SimBox,
    #[serde(default)]
    layout_algorithm: Value,
}

fn default_box() -> SimBox {
    SimBox::new(0.0, 0.0, 800.0, 600.0)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOut<'a> {
    positions: &'a Positions,
    #[serde(skip_serializing_if = "Option::is_none")]
    steps: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_reason: Option<narwhal::StopReason>,
}

fn usage() -> &'static str {
    "narwhal-cli\n\
\n\
USAGE:\n\
  narwhal-cli [layout] [--pretty] [--steps] [--width <w>] [--height <h>] [<path>|-]\n\
  narwhal-cli validate [<path>|-]\n\
\n\
INPUT:\n\
  {\"nodes\": [{\"id\": \"a\", \"mass\": 4}], \"links\": [{\"from\": \"a\", \"to\": \"b\"}],\n\
   \"box\": {\"x\": 0, \"y\": 0, \"width\": 800, \"height\": 600},\n\
   \"layoutAlgorithm\": {\"integration\": \"verlet\", \"approximation\": \"barnes-hut\"}}\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - Link endpoints without a node entry become nodes with default mass.\n\
  - layout prints {\"positions\": {id: {x, y}}}; --steps adds the step count and stop reason.\n\
  - validate checks the options and the graph and prints nothing on success.\n\
  - NARWHAL_LAYOUT_TIMING=1 prints a timing summary to stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1).peekable();
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "layout" => args.command = Command::Layout,
            "validate" => args.command = Command::Validate,
            "--pretty" => args.pretty = true,
            "--steps" => args.with_steps = true,
            "--width" => {
                let Some(w) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.width = Some(parse_extent(w)?);
            }
            "--height" => {
                let Some(h) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.height = Some(parse_extent(h)?);
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn parse_extent(raw: &str) -> Result<f64, CliError> {
    let v = raw.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
    if !(v.is_finite() && v > 0.0) {
        return Err(CliError::Usage(usage()));
    }
    Ok(v)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let input: LayoutInput = serde_json::from_str(&text)?;

    let options = match input.layout_algorithm {
        Value::Null => LayoutOptions::default(),
        value => LayoutOptions::from_value(value)?,
    };
    let graph = input.graph.with_implicit_nodes();
    let mut area = input.area;
    if let Some(w) = args.width {
        area.width = w;
    }
    if let Some(h) = args.height {
        area.height = h;
    }

    match args.command {
        Command::Validate => {
            graph.validate()?;
            Ok(())
        }
        Command::Layout => {
            let result = narwhal::layout(&graph, &options, area)?;
            let out = LayoutOut {
                positions: &result.positions,
                steps: args.with_steps.then_some(result.steps),
                stop_reason: if args.with_steps {
                    result.stop_reason
                } else {
                    None
                },
            };
            write_json(&out, args.pretty)
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
