pub mod image_keyframe_codec;
