use argh::FromArgs;
use std::path::PathBuf;

use ocrtoc::dataset::{Dataset, Overlay, OverlayOptions};
use ocrtoc::io::png::write_image_png_rgb8;
use ocrtoc::k3d::io::ply::write_ply_pointcloud;

#[derive(FromArgs)]
/// Visualize the 6D object pose annotations of a scene
struct Args {
    /// path to the dataset root folder
    #[argh(option)]
    dataset_root: PathBuf,

    /// index of the scene
    #[argh(option, default = "0")]
    scene_id: usize,

    /// index of a frame; required for 2D overlays
    #[argh(option)]
    image_id: Option<usize>,

    /// overlay dimension: 2 for masks on the image, 3 for meshes in the cloud
    #[argh(option, default = "3")]
    dimension: u8,

    /// seed of the tint colors and mesh sampling
    #[argh(option)]
    seed: Option<u64>,

    /// write the overlay to this PNG (2D) or PLY (3D) file instead of the viewer
    #[argh(option)]
    output: Option<PathBuf>,

    /// log level: debug, info, warn or error
    #[argh(option, default = "String::from(\"warn\")")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = argh::from_env();

    env_logger::Builder::new()
        .filter_level(args.log_level.parse()?)
        .init();

    let dataset = Dataset::open(&args.dataset_root)?;
    let options = OverlayOptions { seed: args.seed };
    let overlay = dataset.vis_6dpose(args.scene_id, args.image_id, args.dimension, &options)?;

    if let Some(output) = args.output {
        match &overlay {
            Overlay::Image(image) => write_image_png_rgb8(&output, image)?,
            Overlay::PointCloud(pointcloud) => write_ply_pointcloud(&output, pointcloud)?,
        }
        println!("Saved overlay to {}", output.display());
        return Ok(());
    }

    // create a Rerun recording stream
    let rec = rerun::RecordingStreamBuilder::new("6D Pose Visualizer").spawn()?;

    match overlay {
        Overlay::Image(image) => {
            rec.log(
                "overlay",
                &rerun::Image::from_elements(
                    image.as_slice(),
                    [image.width() as u32, image.height() as u32],
                    rerun::ColorModel::RGB,
                ),
            )?;
        }
        Overlay::PointCloud(pointcloud) => {
            println!("Overlay has #{} points", pointcloud.len());

            let points = pointcloud
                .points()
                .iter()
                .map(|p| rerun::Position3D::new(p[0] as f32, p[1] as f32, p[2] as f32))
                .collect::<Vec<_>>();

            let colors = pointcloud
                .colors()
                .iter()
                .map(|c| {
                    let [r, g, b] = c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8);
                    rerun::Color::from_rgb(r, g, b)
                })
                .collect::<Vec<_>>();

            rec.log("overlay", &rerun::Points3D::new(points).with_colors(colors))?;
        }
    }

    Ok(())
}
