use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, Level};

use adftiff::adf::{AdfDataset, DecodeOptions};
use adftiff::encode::{BigTiffMode, EncodeOptions, GeoTiffReader, SupportedCompression};
use adftiff::pipeline::{self, CancelFlag, DecoderKind};
use adftiff::{io, SpatialReference};

#[derive(Parser)]
#[command(
    name = "adftiff",
    about = "将 ESRI ArcInfo 二进制栅格 (ADF) 转换为分块压缩的 GeoTIFF",
    version
)]
struct Cli {
    /// 输出解码与编码的详细日志
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 将数据集转换为 GeoTIFF
    Convert {
        /// ADF 目录或其中的任一文件 (如 hdr.adf)
        input: PathBuf,
        /// 输出 .tif,默认为 <输入名>_converted.tif
        output: Option<PathBuf>,
        /// LZW | DEFLATE | NONE
        #[arg(default_value = "LZW")]
        compression: String,
        /// 瓦片边长 (像素),须为 2 的幂
        #[arg(long, default_value_t = 256)]
        tile_size: u32,
        /// auto | always | never
        #[arg(long, default_value = "auto")]
        big_tiff: BigTiffMode,
        /// 覆盖无数据值
        #[arg(long, allow_negative_numbers = true)]
        nodata: Option<f64>,
    },
    /// 显示数据集信息
    Info {
        /// ADF 目录或其中的任一文件
        input: PathBuf,
    },
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

/// 文件输入取文件名主干,目录输入取目录名
fn default_output(input: &Path) -> PathBuf {
    let name = if input.is_file() {
        input.file_stem()
    } else {
        input.file_name()
    };
    let name = name.and_then(|n| n.to_str()).unwrap_or("output");
    PathBuf::from(format!("{name}_converted.tif"))
}

fn open_dataset(input: &Path, decode: &DecodeOptions) -> anyhow::Result<AdfDataset> {
    let files = io::load_dir(input).with_context(|| format!("读取 {}", input.display()))?;
    DecoderKind::select(&files)?;
    AdfDataset::open(files, decode).with_context(|| format!("打开 {}", input.display()))
}

fn print_info(dataset: &AdfDataset) {
    let header = &dataset.header;
    let reference: &SpatialReference = &dataset.spatial_reference;
    let (x, y) = header.upper_left();
    println!("数据集信息:");
    println!("   尺寸: {} x {} 像素", header.columns, header.rows);
    println!("   数据类型: {:?}", header.pixel_type);
    match &reference.crs {
        Some(crs) => println!("   投影: {crs}"),
        None => println!("   投影: 未设置"),
    }
    println!("   原点: ({x:.2}, {y:.2})");
    println!(
        "   像元大小: ({:.2}, {:.2})",
        header.cell_size.0, -header.cell_size.1
    );
    println!("   无数据值: {}", header.nodata);
    if let Some(stats) = &dataset.statistics {
        println!(
            "   统计: 最小 {} 最大 {} 均值 {} 标准差 {}",
            stats.min, stats.max, stats.mean, stats.stddev
        );
    }
    if let Ok(bounds) = reference.bounds_lat_lon_deg(header.dimensions()) {
        println!(
            "   经纬度范围: 纬度 {:.6}..{:.6}, 经度 {:.6}..{:.6}",
            bounds.y.min, bounds.y.max, bounds.x.min, bounds.x.max
        );
    }
}

fn run_convert(
    input: PathBuf,
    output: Option<PathBuf>,
    compression: &str,
    tile_size: u32,
    big_tiff: BigTiffMode,
    nodata: Option<f64>,
) -> anyhow::Result<()> {
    let compression: SupportedCompression = compression.parse()?;
    let output = output.unwrap_or_else(|| default_output(&input));

    let mut decode = DecodeOptions::new();
    if let Some(nodata) = nodata {
        decode = decode.with_nodata(nodata);
    }
    let options = EncodeOptions::new()
        .with_compression(compression)
        .with_tile_size(tile_size)
        .with_big_tiff(big_tiff);

    let dataset = open_dataset(&input, &decode)?;
    print_info(&dataset);

    println!("\n正在转换为 GeoTIFF...");
    println!("   输出: {}", output.display());
    println!("   压缩: {compression}");
    let result = pipeline::convert(&dataset, &options, &CancelFlag::new())?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("创建 {}", parent.display()))?;
    }
    std::fs::write(&output, &result.bytes)
        .with_context(|| format!("写入 {}", output.display()))?;
    println!(
        "转换成功: {} 个瓦片, {}",
        result.tiles_written,
        human_bytes(result.bytes.len() as u64)
    );

    println!("\n正在校验输出...");
    let written = std::fs::read(&output).with_context(|| format!("读取 {}", output.display()))?;
    let reader = GeoTiffReader::open(&written).context("重新读取输出失败")?;
    debug!("{}", reader.tiff());
    let (width, height) = reader.dimensions();
    println!("   尺寸: {width} x {height} 像素");
    anyhow::ensure!(
        (width, height) == dataset.header.dimensions(),
        "输出尺寸 {width}x{height} 与数据集不符"
    );
    println!("GeoTIFF 已生成: {}", output.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            input,
            output,
            compression,
            tile_size,
            big_tiff,
            nodata,
        } => run_convert(input, output, &compression, tile_size, big_tiff, nodata),
        Commands::Info { input } => {
            let dataset = open_dataset(&input, &DecodeOptions::new())?;
            print_info(&dataset);
            Ok(())
        }
    }
}
