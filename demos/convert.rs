// 导入必要的库和模块
use adftiff::encode::{EncodeOptions, GeoTiffReader, SupportedCompression};
use adftiff::pipeline::{self, CancelFlag, MemoryRaster};
use adftiff::spatial::parse_crs;
use adftiff::{GridHeader, PixelData, PixelType, SpatialReference};

// 定义常量：输出文件的路径
const OUTPUT_TIF: &str = "data/convert.tif";

// ArcInfo 关键字格式的投影描述，与 prj.adf 中的写法相同
const PRJ: &str = "Projection    UTM
Zone          10
Datum         NAD83
Units         METERS
Parameters
";

fn main() {
    println!("Example: adftiff convert");

    // 定义栅格：300x200 像元，单元 30 米，左下角位于 UTM 10N
    let dimensions = (300, 200);
    let header = GridHeader::new(
        dimensions,
        (30.0, 30.0),
        (500000.0, 4500000.0),
        PixelType::Float32,
        -9999.0,
    );

    // 生成一个斜坡面，左上角一块设为无数据
    let (width, height) = dimensions;
    let mut values = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let value = if x < 20 && y < 20 {
                -9999.0
            } else {
                (x + y) as f32 * 0.5
            };
            values.push(value);
        }
    }

    // 空间参考：投影加上由文件头推出的仿射变换
    let crs = parse_crs(PRJ);
    let reference = SpatialReference::new(crs, header.geo_transform());
    let raster = MemoryRaster::new(header, reference, PixelData::Float32(values)).unwrap();

    // 配置编码参数并转换
    let options = EncodeOptions::new()
        .with_compression(SupportedCompression::Deflate)
        .with_tile_size(128); // 设置瓦片大小为128x128像素
    let output = pipeline::convert(&raster, &options, &CancelFlag::new()).unwrap();
    println!("Wrote {} tiles", output.tiles_written);

    // 写出文件并重新读取校验
    std::fs::create_dir_all("data").unwrap();
    std::fs::write(OUTPUT_TIF, &output.bytes).unwrap();
    let reader = GeoTiffReader::open(&output.bytes).unwrap();
    println!("{}", reader.tiff());
    println!("Saved GeoTIFF to {OUTPUT_TIF}");
}
